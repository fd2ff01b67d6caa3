// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! `output/`: one folder per simulation run.
//!
//! Result folders are discovered on disk (or in the run's archive) rather
//! than derived from the current input, which may have changed since the
//! run was launched.

use super::{child, ini, raw};
use crate::bucket::BucketNode;
use crate::config::files::PARAMETERS_SPECIAL_KEYS;
use crate::config::{Simulation, StudyConfig};
use crate::context::Context;
use crate::error::Result;
use crate::folder::{StructuredFolder, entry_exists, list_entries};
use crate::frequency::MatrixFrequency;
use crate::matrix::{HeadWriter, OutputSeriesMatrix, OutputSynthesis, SynthesisLayout};
use crate::node::{Node, Tree};
use std::collections::BTreeMap;
use std::path::Path;

#[must_use]
pub fn output(context: &Context, config: StudyConfig) -> Node {
    StructuredFolder::node("Output", context, config, |ctx, cfg| {
        let mut children = Tree::new();
        for (name, run) in &cfg.snapshot().outputs {
            let node = simulation(ctx, cfg.next_output(name), run.clone());
            let _ = children.insert(name.clone(), node);
        }
        if entry_exists(cfg, "logs")? {
            let _ = children.insert(
                "logs".to_string(),
                BucketNode::new(ctx, cfg.next_file("logs")).into_node(),
            );
        }
        Ok(children)
    })
}

fn simulation(context: &Context, config: StudyConfig, run: Simulation) -> Node {
    StructuredFolder::node("OutputSimulation", context, config, move |ctx, cfg| {
        let mut children = Tree::from([
            child("about-the-study", about(ctx, cfg.next_file("about-the-study"))),
            child(
                "info",
                ini(ctx, cfg, "info.antares").named("OutputSimulationInfo").into_node(),
            ),
            child("simulation", raw(ctx, cfg, "simulation.log")),
            child("annualSystemCost", raw(ctx, cfg, "annualSystemCost.txt")),
            child("checkIntegrity", raw(ctx, cfg, "checkIntegrity.txt")),
            child(
                "ts-numbers",
                BucketNode::new(ctx, cfg.next_file("ts-numbers")).into_node(),
            ),
        ]);
        let mode = run.mode.as_str();
        let _ = children.insert(
            mode.to_string(),
            simulation_mode(ctx, cfg.next_file(mode), run.clone()),
        );
        if !run.xpansion.is_empty() {
            let _ = children.insert(
                "expansion".to_string(),
                BucketNode::new(ctx, cfg.next_file("expansion")).into_node(),
            );
        }
        if entry_exists(cfg, "logs")? {
            let _ = children.insert(
                "logs".to_string(),
                BucketNode::new(ctx, cfg.next_file("logs")).into_node(),
            );
        }
        Ok(children)
    })
}

fn about(context: &Context, config: StudyConfig) -> Node {
    StructuredFolder::node("OutputSimulationAbout", context, config, |ctx, cfg| {
        Ok(Tree::from([
            child(
                "parameters",
                ini(ctx, cfg, "parameters.ini")
                    .named("GeneralData")
                    .with_special_keys(PARAMETERS_SPECIAL_KEYS)
                    .into_node(),
            ),
            child(
                "study",
                ini(ctx, cfg, "study.ini").named("OutputSimulationAboutStudy").into_node(),
            ),
            child("areas", raw(ctx, cfg, "areas.txt")),
            child("comments", raw(ctx, cfg, "comments.txt")),
            child("links", raw(ctx, cfg, "links.txt")),
        ]))
    })
}

fn simulation_mode(context: &Context, config: StudyConfig, run: Simulation) -> Node {
    StructuredFolder::node("OutputSimulationMode", context, config, move |ctx, cfg| {
        let mut children = Tree::new();
        if run.by_year {
            let years = run.years();
            let node = StructuredFolder::node(
                "OutputSimulationModeMcInd",
                ctx,
                cfg.next_file("mc-ind"),
                move |ctx, cfg| {
                    Ok(years
                        .iter()
                        .map(|year| {
                            let name = format!("{year:05}");
                            let node = mode_common(ctx, cfg.next_file(&name));
                            (name, node)
                        })
                        .collect())
                },
            );
            let _ = children.insert("mc-ind".to_string(), node);
        }
        if run.synthesis {
            let _ = children.insert(
                "mc-all".to_string(),
                mode_common(ctx, cfg.next_file("mc-all")),
            );
        }
        Ok(children)
    })
}

/// `mc-all` or one `mc-ind` year: the result families present on disk
fn mode_common(context: &Context, config: StudyConfig) -> Node {
    StructuredFolder::node("OutputSimulationModeCommon", context, config, |ctx, cfg| {
        type Family = fn(&Context, StudyConfig) -> Node;
        let families: [(&str, Family); 4] = [
            ("areas", output_areas),
            ("grid", grid),
            ("links", output_links),
            ("binding_constraints", binding_constraints),
        ];
        let mut children = Tree::new();
        for (name, family) in families {
            if entry_exists(cfg, name)? {
                let _ = children.insert(name.to_string(), family(ctx, cfg.next_file(name)));
            }
        }
        Ok(children)
    })
}

/// `(stem, file name)` of the files of a folder
fn files(config: &StudyConfig) -> Result<Vec<(String, String)>> {
    Ok(list_entries(config)?
        .into_iter()
        .filter(|(_, is_dir)| !is_dir)
        .map(|(name, _)| {
            let stem = Path::new(&name)
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| name.clone());
            (stem, name)
        })
        .collect())
}

fn directories(config: &StudyConfig) -> Result<Vec<String>> {
    Ok(list_entries(config)?
        .into_iter()
        .filter(|(_, is_dir)| *is_dir)
        .map(|(name, _)| name)
        .collect())
}

/// `<data type>-<frequency>` stem of a result file
fn result_stem(stem: &str) -> Option<(&str, MatrixFrequency)> {
    let (data_type, freq) = stem.rsplit_once('-')?;
    Some((data_type, freq.parse().ok()?))
}

fn output_areas(context: &Context, config: StudyConfig) -> Node {
    StructuredFolder::node("OutputSimulationAreas", context, config, |ctx, cfg| {
        let mut children = Tree::new();
        for area in directories(cfg)? {
            let area_name = area.clone();
            let node = StructuredFolder::node(
                "OutputSimulationAreaItem",
                ctx,
                cfg.next_file(&area),
                move |ctx, cfg| {
                    let mut children = Tree::new();
                    for (stem, file) in files(cfg)? {
                        let Some((data_type, freq)) = result_stem(&stem) else {
                            continue;
                        };
                        let head = HeadWriter::Area {
                            area: area_name.clone(),
                            data_type: data_type.to_string(),
                        };
                        let node =
                            OutputSeriesMatrix::new(ctx, cfg.next_file(&file), freq, head).into_node();
                        let _ = children.insert(stem, node);
                    }
                    Ok(children)
                },
            );
            let _ = children.insert(area, node);
        }
        Ok(children)
    })
}

fn output_links(context: &Context, config: StudyConfig) -> Node {
    StructuredFolder::node("OutputSimulationLinks", context, config, |ctx, cfg| {
        let mut by_origin: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
        for folder in directories(cfg)? {
            if let Some((from, to)) = folder.split_once(" - ") {
                by_origin
                    .entry(from.to_string())
                    .or_default()
                    .push((to.to_string(), folder.clone()));
            }
        }

        let mut children = Tree::new();
        for (from, links) in by_origin {
            let area = from.clone();
            let node = StructuredFolder::node(
                "OutputSimulationLinkArea",
                ctx,
                cfg.clone(),
                move |ctx, cfg| {
                    Ok(links
                        .iter()
                        .map(|(to, folder)| {
                            let node = link_item(ctx, cfg.next_file(folder), &area, to);
                            (to.clone(), node)
                        })
                        .collect())
                },
            );
            let _ = children.insert(from, node);
        }
        Ok(children)
    })
}

fn link_item(context: &Context, config: StudyConfig, from: &str, to: &str) -> Node {
    let (from, to) = (from.to_string(), to.to_string());
    StructuredFolder::node("OutputSimulationLinkItem", context, config, move |ctx, cfg| {
        let mut children = Tree::new();
        for freq in MatrixFrequency::ALL {
            for data_type in ["id", "values"] {
                let name = format!("{data_type}-{freq}");
                let file = format!("{name}.txt");
                if !entry_exists(cfg, &file)? {
                    continue;
                }
                let head = HeadWriter::Link {
                    from: from.clone(),
                    to: to.clone(),
                };
                let node = OutputSeriesMatrix::new(ctx, cfg.next_file(&file), freq, head).into_node();
                let _ = children.insert(name, node);
            }
        }
        Ok(children)
    })
}

fn binding_constraints(context: &Context, config: StudyConfig) -> Node {
    StructuredFolder::node(
        "OutputSimulationBindingConstraintItem",
        context,
        config,
        |ctx, cfg| {
            Ok(MatrixFrequency::ALL
                .into_iter()
                .map(|freq| {
                    let name = format!("binding-constraints-{freq}");
                    let node = OutputSeriesMatrix::new(
                        ctx,
                        cfg.next_file(&format!("{name}.txt")),
                        freq,
                        HeadWriter::BindingConstraint,
                    )
                    .into_node();
                    (name, node)
                })
                .collect())
        },
    )
}

fn grid(context: &Context, config: StudyConfig) -> Node {
    StructuredFolder::node("OutputSimulationModeMcAllGrid", context, config, |ctx, cfg| {
        Ok(files(cfg)?
            .into_iter()
            .map(|(stem, file)| {
                let layout = if stem == "digest" {
                    SynthesisLayout::Digest
                } else {
                    SynthesisLayout::Table
                };
                let node = OutputSynthesis::new(ctx, cfg.next_file(&file), layout).into_node();
                (stem, node)
            })
            .collect())
    })
}

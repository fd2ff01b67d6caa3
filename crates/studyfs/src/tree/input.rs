// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! `input/`: areas, links, clusters and their time series.

use super::{child, ini, raw, series};
use crate::config::files::SETS_SPECIAL_KEYS;
use crate::config::cluster::{RENEWABLE_MIN_VERSION, ST_STORAGE_MIN_VERSION};
use crate::config::{BindingConstraintFrequency, StudyConfig};
use crate::context::Context;
use crate::folder::StructuredFolder;
use crate::frequency::MatrixFrequency;
use crate::ini::{IniType, ini_types};
use crate::matrix::defaults;
use crate::node::{Node, Tree};

/// Daily hydro `mod` series
const HYDRO_DAILY_MOD_VERSION: i32 = 650;
/// Links split into parameters and direct/indirect capacities
const LINK_CAPACITIES_VERSION: i32 = 820;
const ADEQUACY_PATCH_VERSION: i32 = 830;
const HYDRO_MINGEN_VERSION: i32 = 860;
/// One matrix per binding constraint term: `_lt`, `_gt` and `_eq`
const BC_TERMS_VERSION: i32 = 870;

#[must_use]
pub fn input(context: &Context, config: StudyConfig) -> Node {
    StructuredFolder::node("Input", context, config, |ctx, cfg| {
        let mut children = Tree::from([
            child("areas", areas(ctx, cfg.next_file("areas"))),
            child(
                "bindingconstraints",
                binding_constraints(ctx, cfg.next_file("bindingconstraints")),
            ),
            child("hydro", hydro(ctx, cfg.next_file("hydro"))),
            child("links", links(ctx, cfg.next_file("links"))),
            child("load", time_series(ctx, cfg.next_file("load"), "load")),
            child("solar", time_series(ctx, cfg.next_file("solar"), "solar")),
            child("wind", time_series(ctx, cfg.next_file("wind"), "wind")),
            child("misc-gen", per_area_series(ctx, cfg.next_file("misc-gen"), "miscgen-")),
            child("reserves", per_area_series(ctx, cfg.next_file("reserves"), "")),
            child("thermal", thermal(ctx, cfg.next_file("thermal"))),
        ]);
        if cfg.version() >= RENEWABLE_MIN_VERSION {
            let _ = children.insert(
                "renewables".to_string(),
                renewables(ctx, cfg.next_file("renewables")),
            );
        }
        if cfg.version() >= ST_STORAGE_MIN_VERSION {
            let _ = children.insert(
                "st-storage".to_string(),
                st_storage(ctx, cfg.next_file("st-storage")),
            );
        }
        Ok(children)
    })
}

fn areas(context: &Context, config: StudyConfig) -> Node {
    StructuredFolder::node("InputAreas", context, config, |ctx, cfg| {
        let mut children = Tree::from([
            child("list", raw(ctx, cfg, "list.txt")),
            child(
                "sets",
                ini(ctx, cfg, "sets.ini")
                    .named("Sets")
                    .with_special_keys(SETS_SPECIAL_KEYS)
                    .into_node(),
            ),
        ]);
        for area in cfg.area_names() {
            let _ = children.insert(area.clone(), area_item(ctx, cfg.next_file(&area)));
        }
        Ok(children)
    })
}

fn area_item(context: &Context, config: StudyConfig) -> Node {
    StructuredFolder::node("InputAreasItem", context, config, |ctx, cfg| {
        let mut children = Tree::from([
            child(
                "optimization",
                ini(ctx, cfg, "optimization.ini")
                    .named("OptimizationProperties")
                    .into_node(),
            ),
            child("ui", ini(ctx, cfg, "ui.ini").named("InputAreasUi").into_node()),
        ]);
        if cfg.version() >= ADEQUACY_PATCH_VERSION {
            let _ = children.insert(
                "adequacy_patch".to_string(),
                ini(ctx, cfg, "adequacy_patch.ini")
                    .named("AdequacyPatchAreaProperties")
                    .with_types(ini_types(&[(
                        "adequacy-patch",
                        "adequacy-patch-mode",
                        IniType::Str,
                    )]))
                    .into_node(),
            );
        }
        Ok(children)
    })
}

fn bc_freq(time_step: BindingConstraintFrequency) -> MatrixFrequency {
    match time_step {
        BindingConstraintFrequency::Hourly => MatrixFrequency::Hourly,
        BindingConstraintFrequency::Daily => MatrixFrequency::Daily,
        BindingConstraintFrequency::Weekly => MatrixFrequency::Weekly,
    }
}

fn binding_constraints(context: &Context, config: StudyConfig) -> Node {
    StructuredFolder::node("BindingConstraints", context, config, |ctx, cfg| {
        let mut children = Tree::from([child(
            "bindingconstraints",
            ini(ctx, cfg, "bindingconstraints.ini")
                .named("BindingConstraintsIni")
                .into_node(),
        )]);
        for binding in &cfg.snapshot().bindings {
            let freq = bc_freq(binding.time_step);
            let names: Vec<String> = if cfg.version() >= BC_TERMS_VERSION {
                ["lt", "gt", "eq"]
                    .iter()
                    .map(|term| format!("{}_{term}", binding.id))
                    .collect()
            } else {
                vec![binding.id.clone()]
            };
            for name in names {
                let node = series(ctx, cfg, &format!("{name}.txt"))
                    .with_freq(freq)
                    .into_node();
                let _ = children.insert(name, node);
            }
        }
        Ok(children)
    })
}

fn hydro(context: &Context, config: StudyConfig) -> Node {
    StructuredFolder::node("InputHydro", context, config, |ctx, cfg| {
        Ok(Tree::from([
            child("allocation", hydro_allocation(ctx, cfg.next_file("allocation"))),
            child("common", hydro_common(ctx, cfg.next_file("common"))),
            child("prepro", hydro_prepro(ctx, cfg.next_file("prepro"))),
            child("series", hydro_series(ctx, cfg.next_file("series"))),
            child("hydro", ini(ctx, cfg, "hydro.ini").named("InputHydroIni").into_node()),
        ]))
    })
}

fn hydro_allocation(context: &Context, config: StudyConfig) -> Node {
    StructuredFolder::node("InputHydroAllocation", context, config, |ctx, cfg| {
        Ok(cfg
            .area_names()
            .into_iter()
            .map(|area| {
                let node = ini(ctx, cfg, &format!("{area}.ini"))
                    .named("InputHydroAllocationArea")
                    .with_types(ini_types(&[("[allocation", area.as_str(), IniType::Int)]))
                    .into_node();
                (area, node)
            })
            .collect())
    })
}

fn hydro_common(context: &Context, config: StudyConfig) -> Node {
    StructuredFolder::node("InputHydroCommon", context, config, |ctx, cfg| {
        let capacity = StructuredFolder::node(
            "InputHydroCommonCapacity",
            ctx,
            cfg.next_file("capacity"),
            |ctx, cfg| {
                let mut children = Tree::new();
                for area in cfg.area_names() {
                    let matrices: [(&str, defaults::DefaultMatrix, MatrixFrequency); 5] = [
                        ("maxpower", defaults::max_power, MatrixFrequency::Daily),
                        ("reservoir", defaults::reservoir, MatrixFrequency::Daily),
                        ("creditmodulations", defaults::credit_modulation, MatrixFrequency::Hourly),
                        ("inflowPattern", defaults::inflow_pattern, MatrixFrequency::Daily),
                        ("waterValues", defaults::water_values, MatrixFrequency::Daily),
                    ];
                    for (prefix, default_empty, freq) in matrices {
                        let name = format!("{prefix}_{area}");
                        let node = series(ctx, cfg, &format!("{name}.txt"))
                            .with_freq(freq)
                            .with_default(default_empty)
                            .into_node();
                        let _ = children.insert(name, node);
                    }
                }
                Ok(children)
            },
        );
        Ok(Tree::from([child("capacity", capacity)]))
    })
}

fn hydro_prepro(context: &Context, config: StudyConfig) -> Node {
    StructuredFolder::node("InputHydroPrepro", context, config, |ctx, cfg| {
        let mut children = Tree::from([child(
            "correlation",
            ini(ctx, cfg, "correlation.ini").named("PreproCorrelation").into_node(),
        )]);
        for area in cfg.area_names() {
            let node = StructuredFolder::node(
                "InputHydroPreproArea",
                ctx,
                cfg.next_file(&area),
                |ctx, cfg| {
                    Ok(Tree::from([
                        child("energy", raw(ctx, cfg, "energy.txt")),
                        child(
                            "prepro",
                            ini(ctx, cfg, "prepro.ini").named("InputHydroPreproAreaPrepro").into_node(),
                        ),
                    ]))
                },
            );
            let _ = children.insert(area, node);
        }
        Ok(children)
    })
}

fn hydro_series(context: &Context, config: StudyConfig) -> Node {
    StructuredFolder::node("InputHydroSeries", context, config, |ctx, cfg| {
        let mut children = Tree::new();
        for area in cfg.area_names() {
            let node = StructuredFolder::node(
                "InputHydroSeriesArea",
                ctx,
                cfg.next_file(&area),
                |ctx, cfg| {
                    let modulation = if cfg.version() >= HYDRO_DAILY_MOD_VERSION {
                        series(ctx, cfg, "mod.txt")
                            .with_freq(MatrixFrequency::Daily)
                            .with_default(defaults::daily_zeros)
                    } else {
                        series(ctx, cfg, "mod.txt")
                            .with_freq(MatrixFrequency::Monthly)
                            .with_default(defaults::monthly_zeros)
                    };
                    let mut children = Tree::from([
                        child("mod", modulation.into_node()),
                        child(
                            "ror",
                            series(ctx, cfg, "ror.txt")
                                .with_default(defaults::hourly_zeros)
                                .into_node(),
                        ),
                    ]);
                    if cfg.version() >= HYDRO_MINGEN_VERSION {
                        let _ = children.insert(
                            "mingen".to_string(),
                            series(ctx, cfg, "mingen.txt")
                                .with_default(defaults::hourly_zeros)
                                .into_node(),
                        );
                    }
                    Ok(children)
                },
            );
            let _ = children.insert(area, node);
        }
        Ok(children)
    })
}

fn links(context: &Context, config: StudyConfig) -> Node {
    StructuredFolder::node("InputLink", context, config, |ctx, cfg| {
        let mut children = Tree::new();
        for area in cfg.area_names() {
            let node = link_area(ctx, cfg.next_file(&area), area.clone());
            let _ = children.insert(area, node);
        }
        Ok(children)
    })
}

fn link_area(context: &Context, config: StudyConfig, area: String) -> Node {
    StructuredFolder::node("InputLinkArea", context, config, move |ctx, cfg| {
        let mut children = Tree::from([child(
            "properties",
            ini(ctx, cfg, "properties.ini").named("InputLinkAreaProperties").into_node(),
        )]);
        let links = cfg.get_links(&area);
        if cfg.version() < LINK_CAPACITIES_VERSION {
            for link in links {
                let node = series(ctx, cfg, &format!("{link}.txt")).into_node();
                let _ = children.insert(link, node);
            }
            return Ok(children);
        }

        for link in &links {
            let name = format!("{link}_parameters");
            let node = series(ctx, cfg, &format!("{name}.txt")).into_node();
            let _ = children.insert(name, node);
        }
        let capacities = StructuredFolder::node(
            "InputLinkAreaCapacities",
            ctx,
            cfg.next_file("capacities"),
            move |ctx, cfg| {
                let mut children = Tree::new();
                for link in &links {
                    for direction in ["direct", "indirect"] {
                        let name = format!("{link}_{direction}");
                        let node = series(ctx, cfg, &format!("{name}.txt")).into_node();
                        let _ = children.insert(name, node);
                    }
                }
                Ok(children)
            },
        );
        let _ = children.insert("capacities".to_string(), capacities);
        Ok(children)
    })
}

/// `load`, `solar` and `wind`: stochastic generator inputs and ready-made series
fn time_series(context: &Context, config: StudyConfig, prefix: &'static str) -> Node {
    StructuredFolder::node("InputPreproSeries", context, config, move |ctx, cfg| {
        let prepro = StructuredFolder::node(
            "InputPrepro",
            ctx,
            cfg.next_file("prepro"),
            |ctx, cfg| {
                let mut children = Tree::from([child(
                    "correlation",
                    ini(ctx, cfg, "correlation.ini").named("PreproCorrelation").into_node(),
                )]);
                for area in cfg.area_names() {
                    let node = StructuredFolder::node(
                        "InputPreproArea",
                        ctx,
                        cfg.next_file(&area),
                        |ctx, cfg| {
                            let mut children: Tree = ["conversion", "data", "k", "translation"]
                                .into_iter()
                                .map(|name| {
                                    child(name, series(ctx, cfg, &format!("{name}.txt")).into_node())
                                })
                                .collect();
                            let _ = children.insert(
                                "settings".to_string(),
                                ini(ctx, cfg, "settings.ini").named("PreproAreaSettings").into_node(),
                            );
                            Ok(children)
                        },
                    );
                    let _ = children.insert(area, node);
                }
                Ok(children)
            },
        );
        let series_folder = per_area_series(ctx, cfg.next_file("series"), &format!("{prefix}_"));
        Ok(Tree::from([child("prepro", prepro), child("series", series_folder)]))
    })
}

/// One hourly matrix per area, named `<prefix><area>`
fn per_area_series(context: &Context, config: StudyConfig, prefix: &str) -> Node {
    let prefix = prefix.to_string();
    StructuredFolder::node("InputAreaSeries", context, config, move |ctx, cfg| {
        Ok(cfg
            .area_names()
            .into_iter()
            .map(|area| {
                let name = format!("{prefix}{area}");
                let node = series(ctx, cfg, &format!("{name}.txt")).into_node();
                (if prefix.is_empty() { area } else { name }, node)
            })
            .collect())
    })
}

/// `<kind>/clusters/<area>/list.ini`
fn cluster_lists(context: &Context, config: StudyConfig, kind: &'static str) -> Node {
    StructuredFolder::node(kind, context, config, |ctx, cfg| {
        let mut children = Tree::new();
        for area in cfg.area_names() {
            let node = StructuredFolder::node("ClusterListArea", ctx, cfg.next_file(&area), |ctx, cfg| {
                Ok(Tree::from([child(
                    "list",
                    ini(ctx, cfg, "list.ini").named("ClusterList").into_node(),
                )]))
            });
            let _ = children.insert(area, node);
        }
        Ok(children)
    })
}

/// Per area, per cluster folders holding the matrices built by `leaves`
fn per_cluster<I, L>(
    context: &Context,
    config: StudyConfig,
    kind: &'static str,
    ids: I,
    leaves: L,
) -> Node
where
    I: Fn(&StudyConfig, &str) -> Vec<String> + Send + Sync + Copy + 'static,
    L: Fn(&Context, &StudyConfig) -> Tree + Send + Sync + Copy + 'static,
{
    StructuredFolder::node(kind, context, config, move |ctx, cfg| {
        let mut children = Tree::new();
        for area in cfg.area_names() {
            let area_config = cfg.next_file(&area);
            let area_name = area.clone();
            let node = StructuredFolder::node(kind, ctx, area_config, move |ctx, cfg| {
                Ok(ids(cfg, &area_name)
                    .into_iter()
                    .map(|id| {
                        let cluster_config = cfg.next_file(&id);
                        let node = StructuredFolder::node(kind, ctx, cluster_config, move |ctx, cfg| {
                            Ok(leaves(ctx, cfg))
                        });
                        (id, node)
                    })
                    .collect())
            });
            let _ = children.insert(area, node);
        }
        Ok(children)
    })
}

fn thermal(context: &Context, config: StudyConfig) -> Node {
    StructuredFolder::node("InputThermal", context, config, |ctx, cfg| {
        Ok(Tree::from([
            child("areas", ini(ctx, cfg, "areas.ini").named("InputThermalAreasIni").into_node()),
            child(
                "clusters",
                cluster_lists(ctx, cfg.next_file("clusters"), "InputThermalClusters"),
            ),
            child(
                "prepro",
                per_cluster(
                    ctx,
                    cfg.next_file("prepro"),
                    "InputThermalPrepro",
                    |cfg, area| cfg.get_thermal_ids(area),
                    |ctx, cfg| {
                        Tree::from([
                            child(
                                "data",
                                series(ctx, cfg, "data.txt")
                                    .with_freq(MatrixFrequency::Daily)
                                    .into_node(),
                            ),
                            child("modulation", series(ctx, cfg, "modulation.txt").into_node()),
                        ])
                    },
                ),
            ),
            child(
                "series",
                per_cluster(
                    ctx,
                    cfg.next_file("series"),
                    "InputThermalSeries",
                    |cfg, area| cfg.get_thermal_ids(area),
                    |ctx, cfg| {
                        Tree::from([child(
                            "series",
                            series(ctx, cfg, "series.txt")
                                .with_default(defaults::hourly_zeros)
                                .into_node(),
                        )])
                    },
                ),
            ),
        ]))
    })
}

fn renewables(context: &Context, config: StudyConfig) -> Node {
    StructuredFolder::node("ClusteredRenewables", context, config, |ctx, cfg| {
        Ok(Tree::from([
            child(
                "clusters",
                cluster_lists(ctx, cfg.next_file("clusters"), "ClusteredRenewableClusters"),
            ),
            child(
                "series",
                per_cluster(
                    ctx,
                    cfg.next_file("series"),
                    "ClusteredRenewableSeries",
                    |cfg, area| cfg.get_renewable_ids(area),
                    |ctx, cfg| {
                        Tree::from([child(
                            "series",
                            series(ctx, cfg, "series.txt")
                                .with_default(defaults::hourly_zeros)
                                .into_node(),
                        )])
                    },
                ),
            ),
        ]))
    })
}

fn st_storage(context: &Context, config: StudyConfig) -> Node {
    StructuredFolder::node("InputSTStorage", context, config, |ctx, cfg| {
        Ok(Tree::from([
            child(
                "clusters",
                cluster_lists(ctx, cfg.next_file("clusters"), "InputSTStorageClusters"),
            ),
            child(
                "series",
                per_cluster(
                    ctx,
                    cfg.next_file("series"),
                    "InputSTStorageSeries",
                    |cfg, area| cfg.get_st_storage_ids(area),
                    |ctx, cfg| {
                        let matrices: [(&str, &str, defaults::DefaultMatrix); 5] = [
                            ("pmax_injection", "PMAX-injection.txt", defaults::hourly_ones),
                            ("pmax_withdrawal", "PMAX-withdrawal.txt", defaults::hourly_ones),
                            ("inflows", "inflows.txt", defaults::hourly_zeros),
                            ("lower_rule_curve", "lower-rule-curve.txt", defaults::hourly_zeros),
                            ("upper_rule_curve", "upper-rule-curve.txt", defaults::hourly_ones),
                        ];
                        matrices
                            .into_iter()
                            .map(|(name, file, default_empty)| {
                                child(name, series(ctx, cfg, file).with_default(default_empty).into_node())
                            })
                            .collect()
                    },
                ),
            ),
        ]))
    })
}

// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Catalog of a study's folder layout.
//!
//! Every folder is a [`StructuredFolder`] whose builder derives its
//! children from the configuration snapshot; version-dependent entries are
//! gated inline. Free-form folders are [`BucketNode`]s.

pub mod input;
pub mod output;

#[cfg(test)]
mod tests;

use crate::bucket::BucketNode;
use crate::config::StudyConfig;
use crate::config::files::PARAMETERS_SPECIAL_KEYS;
use crate::context::Context;
use crate::folder::StructuredFolder;
use crate::ini::{IniFileNode, IniType, ini_types};
use crate::matrix::InputSeriesMatrix;
use crate::node::{Node, Tree};
use crate::raw::RawFileNode;

/// Root of a study tree
#[must_use]
pub fn file_study_tree(context: &Context, config: StudyConfig) -> Node {
    StructuredFolder::node("FileStudyTree", context, config, |ctx, cfg| {
        let mut children = Tree::from([
            child(
                "Desktop",
                ini(ctx, cfg, "Desktop.ini")
                    .named("Desktop")
                    .with_types(ini_types(&[
                        (".shell", "iconfile", IniType::Str),
                        (".shell", "infotip", IniType::Str),
                    ]))
                    .into_node(),
            ),
            child(
                "study",
                ini(ctx, cfg, "study.antares")
                    .named("StudyAntares")
                    .with_types(ini_types(&[
                        ("antares", "version", IniType::Int),
                        ("antares", "caption", IniType::Str),
                        ("antares", "created", IniType::Int),
                        ("antares", "lastsave", IniType::Int),
                        ("antares", "author", IniType::Str),
                    ]))
                    .into_node(),
            ),
            child("settings", settings(ctx, cfg.next_file("settings"))),
            child("layers", layers(ctx, cfg.next_file("layers"))),
            child("logs", BucketNode::new(ctx, cfg.next_file("logs")).into_node()),
            child("input", input::input(ctx, cfg.next_file("input"))),
            child("user", user(ctx, cfg.next_file("user"))),
        ]);
        if !cfg.snapshot().outputs.is_empty() {
            let mut output_config = cfg.next_file("output");
            if let Some(output_path) = &cfg.snapshot().output_path {
                output_config.path = output_path.clone();
            }
            let _ = children.insert("output".to_string(), output::output(ctx, output_config));
        }
        Ok(children)
    })
}

fn settings(context: &Context, config: StudyConfig) -> Node {
    StructuredFolder::node("Settings", context, config, |ctx, cfg| {
        Ok(Tree::from([
            child(
                "resources",
                BucketNode::new(ctx, cfg.next_file("resources"))
                    .with_planned("study.ico", |ctx, cfg| RawFileNode::new(ctx, cfg).into_node())
                    .into_node(),
            ),
            child(
                "simulations",
                BucketNode::new(ctx, cfg.next_file("simulations")).into_node(),
            ),
            child("comments", raw(ctx, cfg, "comments.txt")),
            child(
                "generaldata",
                ini(ctx, cfg, "generaldata.ini")
                    .named("GeneralData")
                    .with_special_keys(PARAMETERS_SPECIAL_KEYS)
                    .into_node(),
            ),
            child(
                "scenariobuilder",
                ini(ctx, cfg, "scenariobuilder.dat")
                    .named("ScenarioBuilder")
                    .into_node(),
            ),
        ]))
    })
}

fn layers(context: &Context, config: StudyConfig) -> Node {
    StructuredFolder::node("Layers", context, config, |ctx, cfg| {
        Ok(Tree::from([child(
            "layers",
            ini(ctx, cfg, "layers.ini").named("LayersIni").into_node(),
        )]))
    })
}

fn user(context: &Context, config: StudyConfig) -> Node {
    BucketNode::new(context, config)
        .with_planned("expansion", expansion)
        .into_node()
}

/// `user/expansion`: xpansion settings, candidates and matrix resources
fn expansion(context: &Context, config: StudyConfig) -> Node {
    BucketNode::new(context, config)
        .with_planned("settings.ini", |ctx, cfg| {
            IniFileNode::new(ctx, cfg)
                .named("ExpansionSettings")
                .flat()
                .into_node()
        })
        .with_planned("candidates.ini", |ctx, cfg| {
            IniFileNode::new(ctx, cfg).named("ExpansionCandidates").into_node()
        })
        .with_planned("capa", |ctx, cfg| BucketNode::matrix_resources(ctx, cfg).into_node())
        .with_planned("weights", |ctx, cfg| {
            BucketNode::matrix_resources(ctx, cfg).into_node()
        })
        .with_planned("constraints", |ctx, cfg| {
            BucketNode::new(ctx, cfg).into_node()
        })
        .into_node()
}

pub(crate) fn child(name: impl Into<String>, node: Node) -> (String, Node) {
    (name.into(), node)
}

pub(crate) fn ini(context: &Context, config: &StudyConfig, file: &str) -> IniFileNode {
    IniFileNode::new(context, config.next_file(file))
}

pub(crate) fn raw(context: &Context, config: &StudyConfig, file: &str) -> Node {
    RawFileNode::new(context, config.next_file(file)).into_node()
}

pub(crate) fn series(context: &Context, config: &StudyConfig, file: &str) -> InputSeriesMatrix {
    InputSeriesMatrix::new(context, config.next_file(file))
}

use bnd_bundle::{resolve, Bundle, BundleResource, ParseOptions};
use bnd_resources::{CodecOptions, Resource, SUPPORTED_TYPES};
use clap::{Args, ValueEnum};
use itertools::Itertools;
use miette::{Context, IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use similar::{ChangeTag, TextDiff};
use std::{collections::BTreeSet, fmt::Display, path::PathBuf};

use crate::commands::read_file;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum Mode {
    #[default]
    Symantic,
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Change {
    Added(String),
    Removed(String),
    Comparison(String, String, String),
    Context(Vec<String>),
    Modified(String, Vec<Change>),
}

impl Change {
    fn push(&mut self, change: Change) {
        if let Change::Modified(_, children) = self {
            children.push(change);
        }
    }
}

impl Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Change::Added(v) => writeln!(f, "✅ {}", v.green()),
            Change::Removed(v) => writeln!(f, "❌ {}", v.red()),
            Change::Comparison(key, old, new) => {
                writeln!(f, "* {}: {} vs {}", key, old.red(), new.green())
            }
            Change::Context(lines) => {
                writeln!(f, "{}", lines.iter().map(|l| format!(" {l}")).join("\n"))
            }
            Change::Modified(v, children) => {
                writeln!(f, "🔃 {}", v.blue())?;
                let body = children.iter().map(|c| c.to_string()).join("");
                for line in body.lines().filter(|l| !l.trim().is_empty()) {
                    writeln!(f, "  {line}")?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Args)]
pub struct DiffArgs {
    /// An input bundle
    #[arg(short, long, value_name = "FILE")]
    left: PathBuf,

    /// An input bundle
    #[arg(short, long, value_name = "FILE")]
    right: PathBuf,

    /// Comparison mode
    #[arg(short, long, value_enum, default_value_t=Mode::Symantic)]
    mode: Mode,
}

fn label(bundle: &Bundle, resource: &BundleResource) -> String {
    match bundle.debug_name(resource.id()) {
        Some(name) => format!("{:016x} {} ({name})", resource.id(), resource.resource_type()),
        None => format!("{:016x} {}", resource.id(), resource.resource_type()),
    }
}

impl DiffArgs {
    /// Line diff of the decoded graphs as JSON
    fn handle_graph(&self, left: &Resource, right: &Resource) -> Result<Option<Change>> {
        let old = serde_json::to_string_pretty(left).into_diagnostic()?;
        let new = serde_json::to_string_pretty(right).into_diagnostic()?;

        let diff = TextDiff::from_lines(&old, &new);
        if diff.ratio() >= 1.0 {
            return Ok(None);
        }

        let mut comparison = Vec::new();
        for op in diff.ops().iter() {
            for change in diff.iter_inline_changes(op) {
                let marker = match change.tag() {
                    ChangeTag::Equal if self.mode == Mode::Symantic => continue,
                    ChangeTag::Equal => " ",
                    ChangeTag::Delete => "-",
                    ChangeTag::Insert => "+",
                };

                let mut context = String::from(marker);
                for (emphasized, value) in change.iter_strings_lossy() {
                    let value = value.trim_end_matches('\n');
                    if emphasized && change.tag() == ChangeTag::Insert {
                        context.push_str(&format!("{}", value.green().underline()));
                    } else if emphasized {
                        context.push_str(&format!("{}", value.red().underline()));
                    } else {
                        context.push_str(&format!("{}", value.dimmed()));
                    }
                }
                comparison.push(context);
            }
        }

        Ok(Some(Change::Context(comparison)))
    }

    fn handle_resource(
        &self,
        left: (&Bundle, &BundleResource, &[u8]),
        right: (&Bundle, &BundleResource, &[u8]),
    ) -> Result<Option<Change>> {
        let (left_bundle, left_resource, left_data) = left;
        let (right_bundle, right_resource, right_data) = right;

        let old = resolve(left_bundle, left_resource, left_data)?.map(|p| p.bytes);
        let new = resolve(right_bundle, right_resource, right_data)?.map(|p| p.bytes);
        let type_changed = left_resource.resource_type() != right_resource.resource_type();
        if old == new && !type_changed {
            return Ok(None);
        }

        let mut result = Change::Modified(label(right_bundle, right_resource), Vec::new());
        if type_changed {
            result.push(Change::Comparison(
                "type".into(),
                left_resource.resource_type().to_string(),
                right_resource.resource_type().to_string(),
            ));
            return Ok(Some(result));
        }

        let old_len = old.as_ref().map_or(0, Vec::len);
        let new_len = new.as_ref().map_or(0, Vec::len);
        if old_len != new_len {
            result.push(Change::Comparison(
                "size".into(),
                old_len.to_string(),
                new_len.to_string(),
            ));
        }

        if SUPPORTED_TYPES.contains(&right_resource.resource_type()) {
            let options = CodecOptions::default();
            let decoded = Resource::decode_resource(left_data, left_bundle, left_resource, &options)
                .and_then(|old| {
                    Resource::decode_resource(right_data, right_bundle, right_resource, &options)
                        .map(|new| (old, new))
                });

            match decoded {
                Ok((old, new)) => {
                    if let Some(change) = self.handle_graph(&old, &new)? {
                        result.push(change);
                    }
                }
                Err(e) => result.push(Change::Context(vec![format!(
                    "{}",
                    format!("could not decode: {e}").dimmed()
                )])),
            }
        }

        Ok(Some(result))
    }

    fn handle_bundle(
        &self,
        name: &str,
        (left, left_data): (&Bundle, &[u8]),
        (right, right_data): (&Bundle, &[u8]),
    ) -> Result<Option<Change>> {
        let mut result = Change::Modified(name.into(), Vec::new());

        if left.platform != right.platform {
            result.push(Change::Comparison(
                "platform".into(),
                left.platform.to_string(),
                right.platform.to_string(),
            ));
        }

        if left.len() != right.len() {
            result.push(Change::Comparison(
                "resources".into(),
                left.len().to_string(),
                right.len().to_string(),
            ));
        }

        if self.mode == Mode::Full {
            if left.header.flags != right.header.flags {
                result.push(Change::Comparison(
                    "flags".into(),
                    format!("{:#x}", left.header.flags.0),
                    format!("{:#x}", right.header.flags.0),
                ));
            }

            if left.debug_data.is_some() != right.debug_data.is_some() {
                result.push(Change::Comparison(
                    "debug data".into(),
                    left.debug_data.is_some().to_string(),
                    right.debug_data.is_some().to_string(),
                ));
            }
        }

        let left_ids = left.resources().map(|r| r.id()).collect::<BTreeSet<_>>();
        let right_ids = right.resources().map(|r| r.id()).collect::<BTreeSet<_>>();

        let mut changes = Vec::new();
        for id in right_ids.difference(&left_ids) {
            if let Some(resource) = right.by_id(*id) {
                changes.push(Change::Added(label(right, resource)));
            }
        }

        for id in left_ids.difference(&right_ids) {
            if let Some(resource) = left.by_id(*id) {
                changes.push(Change::Removed(label(left, resource)));
            }
        }

        for id in left_ids.intersection(&right_ids) {
            if let (Some(l), Some(r)) = (left.by_id(*id), right.by_id(*id)) {
                if let Some(change) =
                    self.handle_resource((left, l, left_data), (right, r, right_data))?
                {
                    changes.push(change);
                }
            }
        }

        changes.sort();
        for change in changes {
            result.push(change);
        }

        match &result {
            Change::Modified(_, children) if children.is_empty() => Ok(None),
            _ => Ok(Some(result)),
        }
    }

    pub fn handle(&self) -> Result<()> {
        let l = read_file(&self.left)?;
        let left = Bundle::parse(&l, &ParseOptions::default())
            .context(format!("parsing {}", self.left.display()))?;

        let r = read_file(&self.right)?;
        let right = Bundle::parse(&r, &ParseOptions::default())
            .context(format!("parsing {}", self.right.display()))?;

        let difference =
            self.handle_bundle(&self.left.to_string_lossy(), (&left, &l), (&right, &r))?;

        if let Some(d) = difference {
            println!("{}", d);
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::Change;

    #[test]
    fn nested_changes_are_indented() {
        let change = Change::Modified(
            "bundle".into(),
            vec![
                Change::Comparison("size".into(), "1".into(), "2".into()),
                Change::Modified("inner".into(), vec![Change::Context(vec!["+x".into()])]),
            ],
        );

        let text = change.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("  * size"));
        assert!(lines[2].starts_with("  🔃"));
        assert!(lines[3].starts_with("     +x"));
    }
}

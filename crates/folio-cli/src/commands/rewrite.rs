//! Rewrite command handler

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};

use folio_core::{Config, RuleSet};

use crate::output::Output;

/// Run the configured substitution rules over a file, or stdin
pub fn rewrite(config: &Config, file: Option<PathBuf>, output: &Output) -> Result<()> {
    let text = match &file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {:?}", path))?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            text
        }
    };

    let rules = config.rule_set()?;
    let (rewritten, changed) = apply(&rules, &text);
    output.print_rewrite(&rewritten, changed);
    Ok(())
}

fn apply(rules: &RuleSet, text: &str) -> (String, bool) {
    let rewritten = rules.rewrite(text);
    let changed = rewritten != text;
    (rewritten.into_owned(), changed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_default_rules() {
        let rules = Config::default().rule_set().unwrap();

        let (text, changed) = apply(&rules, "Saya pikir anda benar.\nSAYA tidak.");
        assert_eq!(text, "Aku pikir kamu benar.\nSAYA tidak.");
        assert!(changed);

        let (text, changed) = apply(&rules, "sayang sekali");
        assert_eq!(text, "sayang sekali");
        assert!(!changed);
    }
}

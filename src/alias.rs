use std::collections::HashMap;

use crate::lexer::{self, TokenKind};
use crate::parser::Pipeline;

/// Read-only after startup: name → raw replacement string, as loaded by
/// `config::load_alias_table`.
#[derive(Debug, Default, Clone)]
pub struct AliasTable(HashMap<String, String>);

impl AliasTable {
    pub fn new() -> Self {
        AliasTable(HashMap::new())
    }

    pub fn from_map(map: HashMap<String, String>) -> Self {
        AliasTable(map)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

/// Rewrite each command's leading argument token against `table`, one level
/// only — the replacement's own tokens are never looked up again.
pub fn resolve(pipeline: &mut Pipeline, table: &AliasTable) {
    for command in &mut pipeline.commands {
        let Some(first) = command.args.first() else {
            continue;
        };
        let Some(replacement) = table.get(first) else {
            continue;
        };
        // A malformed alias value (e.g. an unterminated quote) is left in
        // place untouched rather than propagated as a shell-level error —
        // the alias table is trusted config, not user input.
        let Ok(tokens) = lexer::tokenize(replacement) else {
            continue;
        };
        let mut expanded: Vec<String> = tokens
            .into_iter()
            .filter(|t| t.kind == TokenKind::Word)
            .map(|t| t.text)
            .collect();
        if expanded.is_empty() {
            continue;
        }
        let remaining = command.args.split_off(1);
        expanded.extend(remaining);
        command.args = expanded;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn table(pairs: &[(&str, &str)]) -> AliasTable {
        AliasTable::from_map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn pipeline(input: &str) -> Pipeline {
        parse(tokenize(input).unwrap()).unwrap()
    }

    #[test]
    fn expands_leading_token_one_level() {
        let t = table(&[("ll", "ls -la")]);
        let mut p = pipeline("ll /tmp");
        resolve(&mut p, &t);
        assert_eq!(p.commands[0].args, vec!["ls", "-la", "/tmp"]);
    }

    #[test]
    fn non_aliased_command_is_untouched() {
        let t = table(&[("ll", "ls -la")]);
        let mut p = pipeline("cat file.txt");
        resolve(&mut p, &t);
        assert_eq!(p.commands[0].args, vec!["cat", "file.txt"]);
    }

    #[test]
    fn expansion_is_not_recursive() {
        // alias ls=ls -la must not loop forever or re-expand the result.
        let t = table(&[("ls", "ls -la")]);
        let mut p = pipeline("ls");
        resolve(&mut p, &t);
        assert_eq!(p.commands[0].args, vec!["ls", "-la"]);
    }

    #[test]
    fn each_pipeline_command_resolved_independently() {
        let t = table(&[("ll", "ls -la")]);
        let mut p = pipeline("ll | ll");
        resolve(&mut p, &t);
        assert_eq!(p.commands[0].args, vec!["ls", "-la"]);
        assert_eq!(p.commands[1].args, vec!["ls", "-la"]);
    }
}

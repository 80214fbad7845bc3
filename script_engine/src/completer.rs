//! Name completion

use crate::builtins::Builtins;
use crate::inspect;
use crate::lexer::Keyword;
use crate::namespace::Namespace;

/// Returns sorted completions for `text`, or for the token ending `line`
/// when `text` is empty
///
/// A dotted token completes attributes of the object its prefix names.
pub fn complete(ns: &Namespace, builtins: &Builtins, line: &str, text: &str) -> Vec<String> {
    let token = if text.is_empty() {
        trailing_token(line)
    } else {
        text
    };

    let mut matches: Vec<String> = match token.rsplit_once('.') {
        Some((base, partial)) => {
            let resolution = inspect::resolve(ns, builtins, base);
            if !resolution.is_complete() {
                return Vec::new();
            }
            resolution
                .value
                .map(|value| value.attr_names())
                .unwrap_or_default()
                .into_iter()
                .filter(|name| name.starts_with(partial))
                .map(|name| format!("{}.{}", base, name))
                .collect()
        }
        None => ns
            .names()
            .chain(builtins.names())
            .chain(Keyword::SUPPORTED)
            .filter(|name| name.starts_with(token))
            .map(str::to_string)
            .collect(),
    };

    matches.sort();
    matches.dedup();
    matches
}

fn trailing_token(line: &str) -> &str {
    let start = line
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphanumeric() || *c == '_' || *c == '.')
        .last()
        .map_or(line.len(), |(i, _)| i);
    &line[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Object, Value};

    #[test]
    fn test_completes_names_builtins_and_keywords() {
        let mut ns = Namespace::new();
        ns.set("product", Value::Int(1));
        let builtins = Builtins::new();

        assert_eq!(complete(&ns, &builtins, "", "pr"), vec!["print", "product"]);
        assert_eq!(complete(&ns, &builtins, "", "pa"), vec!["pass"]);
    }

    #[test]
    fn test_completes_attributes() {
        let mut ns = Namespace::new();
        let object = Object::namespace();
        object.set("alpha", Value::Int(1));
        object.set("beta", Value::Int(2));
        ns.set("obj", Value::object(object));
        let builtins = Builtins::new();

        assert_eq!(complete(&ns, &builtins, "", "obj.a"), vec!["obj.alpha"]);
        assert_eq!(complete(&ns, &builtins, "", "math.sq"), vec!["math.sqrt"]);
        assert!(complete(&ns, &builtins, "", "nothing.a").is_empty());
    }

    #[test]
    fn test_token_taken_from_line() {
        let ns = Namespace::new();
        let builtins = Builtins::new();
        assert_eq!(complete(&ns, &builtins, "x = le", ""), vec!["len"]);
        assert_eq!(trailing_token("print(sys.std"), "sys.std");
    }
}

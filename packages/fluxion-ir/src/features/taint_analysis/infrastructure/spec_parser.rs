/*
 * Taint Specification Parser
 *
 * Line-oriented format. Each non-empty, non-comment line names a function
 * followed by space-separated descriptors:
 *
 *   read   src ret
 *   recv   src arg1D
 *   strlen pipe arg0D->retV
 *   printf snk afterarg1V
 *   free   ignore
 *
 * Positions are `arg<N>`, `afterarg<N>` or `ret`, optionally suffixed
 * with `V` (value) or `D` (dereferenced memory); bare positions read as
 * values. Comment lines start with `#`. Unparseable input is a fatal
 * configuration error.
 */

use crate::features::taint_analysis::domain::{
    AccessMode, FunctionTaintSpec, PipeSpec, Position, TaintPos, TaintSpecConfig,
};
use crate::shared::models::{FluxionError, Result};
use std::path::Path;

pub fn parse_file(path: &Path) -> Result<TaintSpecConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| FluxionError::config(format!("cannot read taint spec {path:?}: {e}")))?;
    parse_str(&content)
}

pub fn parse_str(content: &str) -> Result<TaintSpecConfig> {
    let mut config = TaintSpecConfig::default();
    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        parse_line(line, &mut config)
            .map_err(|e| FluxionError::config(format!("taint spec line {}: {e}", lineno + 1)))?;
    }
    Ok(config)
}

fn parse_line(line: &str, config: &mut TaintSpecConfig) -> std::result::Result<(), String> {
    let mut tokens = line.split_whitespace();
    let name = tokens.next().ok_or("missing function name")?;
    let mut spec = FunctionTaintSpec::default();

    let tokens: Vec<&str> = tokens.collect();
    if tokens.is_empty() {
        return Err("function without descriptors".into());
    }
    let mut i = 0;
    while i < tokens.len() {
        match tokens[i] {
            "src" => {
                let pos = tokens.get(i + 1).ok_or("src needs a position")?;
                spec.sources.push(parse_pos(pos)?);
                i += 2;
            }
            "snk" => {
                let pos = tokens.get(i + 1).ok_or("snk needs a position")?;
                spec.sinks.push(parse_pos(pos)?);
                i += 2;
            }
            "pipe" => {
                let arrow = tokens.get(i + 1).ok_or("pipe needs from->to")?;
                let (from, to) = arrow
                    .split_once("->")
                    .ok_or_else(|| format!("bad pipe descriptor '{arrow}'"))?;
                spec.pipes.push(PipeSpec {
                    from: parse_pos(from)?,
                    to: parse_pos(to)?,
                });
                i += 2;
            }
            "ignore" => {
                spec.ignored = true;
                i += 1;
            }
            other => return Err(format!("unknown descriptor '{other}'")),
        }
    }
    config.insert(name, spec);
    Ok(())
}

fn parse_pos(text: &str) -> std::result::Result<TaintPos, String> {
    let (body, mode) = match text.as_bytes().last() {
        Some(b'V') => (&text[..text.len() - 1], AccessMode::Value),
        Some(b'D') => (&text[..text.len() - 1], AccessMode::Deref),
        _ => (text, AccessMode::Value),
    };
    let position = if body == "ret" {
        Position::Ret
    } else if let Some(idx) = body.strip_prefix("afterarg") {
        Position::AfterArg(parse_index(idx)?)
    } else if let Some(idx) = body.strip_prefix("arg") {
        Position::Arg(parse_index(idx)?)
    } else {
        return Err(format!("bad position descriptor '{text}'"));
    };
    Ok(TaintPos::new(position, mode))
}

fn parse_index(text: &str) -> std::result::Result<usize, String> {
    text.parse()
        .map_err(|_| format!("bad argument index '{text}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sources_sinks_and_pipes() {
        let config = parse_str(
            "# io functions\n\
             read src ret\n\
             strlen pipe arg0D->retV\n\
             printf snk arg0D snk afterarg1V\n",
        )
        .unwrap();
        assert_eq!(config.len(), 3);

        let read = config.get("read").unwrap();
        assert_eq!(
            read.sources,
            vec![TaintPos::new(Position::Ret, AccessMode::Value)]
        );

        let strlen = config.get("strlen").unwrap();
        assert_eq!(strlen.pipes.len(), 1);
        assert_eq!(
            strlen.pipes[0].from,
            TaintPos::new(Position::Arg(0), AccessMode::Deref)
        );
        assert_eq!(
            strlen.pipes[0].to,
            TaintPos::new(Position::Ret, AccessMode::Value)
        );

        let printf = config.get("printf").unwrap();
        assert_eq!(printf.sinks.len(), 2);
        assert_eq!(printf.sinks[1].position, Position::AfterArg(1));
    }

    #[test]
    fn ignore_suppresses_function() {
        let config = parse_str("free ignore\n").unwrap();
        assert!(config.get("free").is_none());
        assert_eq!(config.len(), 1);
    }

    #[test]
    fn bad_descriptor_is_config_error() {
        let err = parse_str("read taints ret\n").unwrap_err();
        assert!(matches!(err, FluxionError::Config(_)));
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn bad_position_is_config_error() {
        assert!(parse_str("read src argXV\n").is_err());
        assert!(parse_str("read src bogus\n").is_err());
    }

    #[test]
    fn after_arg_selects_tail_arguments() {
        let pos = TaintPos::new(Position::AfterArg(1), AccessMode::Value);
        assert_eq!(pos.arg_indices(4), vec![1, 2, 3]);
        let pos = TaintPos::new(Position::Arg(2), AccessMode::Value);
        assert_eq!(pos.arg_indices(2), Vec::<usize>::new());
    }
}

//! `#include "name"` resolution for shader sources.
//!
//! Includes are registered on the context by name. Resolution is textual and
//! recursive; the resolved text is what shader and program keys are built
//! from, so two sources that expand to the same text share one program.

use rustc_hash::FxHashMap;

use crate::errors::{GlError, Result};

fn include_target(line: &str) -> Option<&str> {
    line.trim()
        .strip_prefix("#include")?
        .trim()
        .strip_prefix('"')?
        .strip_suffix('"')
}

fn expand(source: &str, includes: &FxHashMap<String, String>, depth_left: u32, out: &mut String) -> Result<()> {
    for line in source.lines() {
        let Some(name) = include_target(line) else {
            out.push_str(line);
            out.push('\n');
            continue;
        };
        if depth_left == 0 {
            return Err(GlError::IncludeDepthExceeded(name.to_string()));
        }
        let body = includes.get(name).ok_or_else(|| GlError::MissingInclude(name.to_string()))?;
        expand(body, includes, depth_left - 1, out)?;
    }
    Ok(())
}

/// Expands every `#include` in `source`, at most `max_depth` levels deep.
pub(crate) fn resolve_includes(source: &str, includes: &FxHashMap<String, String>, max_depth: u32) -> Result<String> {
    if !source.contains("#include") {
        return Ok(source.to_string());
    }
    let mut out = String::with_capacity(source.len());
    expand(source, includes, max_depth, &mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn includes(entries: &[(&str, &str)]) -> FxHashMap<String, String> {
        entries.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    #[test]
    fn test_nested_includes_expand_in_place() {
        let table = includes(&[("common", "#include \"math\"\nvec4 tint;"), ("math", "float pi;")]);
        let resolved = resolve_includes("#version 330\n#include \"common\"\nvoid main() {}", &table, 4).unwrap();
        assert_eq!(resolved, "#version 330\nfloat pi;\nvec4 tint;\nvoid main() {}\n");
    }

    #[test]
    fn test_source_without_includes_is_untouched() {
        let source = "void main() {}";
        assert_eq!(resolve_includes(source, &FxHashMap::default(), 4).unwrap(), source);
    }

    #[test]
    fn test_missing_include() {
        let err = resolve_includes("#include \"nowhere\"", &FxHashMap::default(), 4).unwrap_err();
        assert!(matches!(err, GlError::MissingInclude(name) if name == "nowhere"));
    }

    #[test]
    fn test_self_include_hits_depth_limit() {
        let table = includes(&[("loop", "#include \"loop\"")]);
        let err = resolve_includes("#include \"loop\"", &table, 3).unwrap_err();
        assert!(matches!(err, GlError::IncludeDepthExceeded(_)));
    }
}

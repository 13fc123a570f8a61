//! `@directive` grammar.
//!
//! Directives form a closed set: every keyword maps to one [`Directive`]
//! variant and the parser matches on it exhaustively.
use super::SourceLocation;
use super::scope::is_valid_name;
use crate::error::CompileError;

/// A parsed directive line. Arguments are unexpanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `@set NAME=VALUE`
    Set {
        /// Variable name.
        name: String,
        /// Raw value (expanded by the parser).
        value: String,
    },
    /// `@ignore GLOB...`
    Ignore {
        /// One or more globs.
        globs: Vec<String>,
    },
    /// `@template NAME`
    Template {
        /// Template name.
        name: String,
    },
    /// `@chmod PATH MODE`
    Chmod {
        /// Output-relative path.
        path: String,
        /// Permission bits.
        mode: u32,
    },
    /// `@include PATH`
    Include {
        /// Path relative to the including file.
        path: String,
    },
    /// `@copy SRC DEST`
    Copy {
        /// Source relative to the schema file.
        source: String,
        /// Output-relative destination.
        dest: String,
    },
    /// `@symlink TARGET LINK`
    Symlink {
        /// Link target.
        target: String,
        /// Output-relative link path.
        link: String,
    },
}

impl Directive {
    /// Parse a trimmed directive line (starting with `@`).
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::Parse`] for an unknown keyword, a wrong number
    /// of arguments, an invalid variable name, or a bad permission mode.
    pub fn parse(line: &str, location: &SourceLocation) -> Result<Self, CompileError> {
        let body = line.strip_prefix('@').unwrap_or(line);
        let (keyword, rest) = body
            .split_once(char::is_whitespace)
            .map_or((body, ""), |(k, r)| (k, r.trim()));
        let args: Vec<&str> = rest.split_whitespace().collect();
        let err = |message: String| CompileError::parse(location.clone(), message, line);

        match keyword {
            "set" => {
                let Some((name, value)) = rest.split_once('=') else {
                    return Err(err(usage("set")));
                };
                let name = name.trim();
                if !is_valid_name(name) {
                    return Err(err(format!("invalid variable name `{name}`")));
                }
                Ok(Self::Set {
                    name: name.to_string(),
                    value: value.trim().to_string(),
                })
            }
            "ignore" if !args.is_empty() => Ok(Self::Ignore {
                globs: args.iter().map(|g| (*g).to_string()).collect(),
            }),
            "template" => match args.as_slice() {
                [name] => Ok(Self::Template {
                    name: (*name).to_string(),
                }),
                _ => Err(err(usage(keyword))),
            },
            "chmod" => match args.as_slice() {
                [path, mode] => {
                    let mode = parse_mode(mode)
                        .ok_or_else(|| err(format!("invalid permission mode `{mode}`")))?;
                    Ok(Self::Chmod {
                        path: (*path).to_string(),
                        mode,
                    })
                }
                _ => Err(err(usage(keyword))),
            },
            "include" => match args.as_slice() {
                [path] => Ok(Self::Include {
                    path: (*path).to_string(),
                }),
                _ => Err(err(usage(keyword))),
            },
            "copy" => match args.as_slice() {
                [source, dest] => Ok(Self::Copy {
                    source: (*source).to_string(),
                    dest: (*dest).to_string(),
                }),
                _ => Err(err(usage(keyword))),
            },
            "symlink" => match args.as_slice() {
                [target, link] => Ok(Self::Symlink {
                    target: (*target).to_string(),
                    link: (*link).to_string(),
                }),
                _ => Err(err(usage(keyword))),
            },
            "ignore" => Err(err(usage(keyword))),
            _ => Err(err(format!("unknown directive `@{keyword}`"))),
        }
    }
}

fn usage(keyword: &str) -> String {
    let form = match keyword {
        "set" => "@set NAME=VALUE",
        "ignore" => "@ignore GLOB...",
        "template" => "@template NAME",
        "chmod" => "@chmod PATH MODE",
        "include" => "@include PATH",
        "copy" => "@copy SRC DEST",
        _ => "@symlink TARGET LINK",
    };
    format!("malformed directive, usage: {form}")
}

/// Parse a permission mode: octal (`644`, `0755`, `0o755`) or `+x` / `+w`.
///
/// # Examples
///
/// ```
/// use lrc_cli::schema::directive::parse_mode;
///
/// assert_eq!(parse_mode("755"), Some(0o755));
/// assert_eq!(parse_mode("0o644"), Some(0o644));
/// assert_eq!(parse_mode("+x"), Some(0o755));
/// assert_eq!(parse_mode("rwx"), None);
/// ```
#[must_use]
pub fn parse_mode(text: &str) -> Option<u32> {
    match text {
        "+x" => return Some(0o755),
        "+w" => return Some(0o644),
        _ => {}
    }
    let digits = text
        .strip_prefix("0o")
        .or_else(|| text.strip_prefix("0O"))
        .unwrap_or(text);
    if digits.is_empty() {
        return None;
    }
    u32::from_str_radix(digits, 8)
        .ok()
        .filter(|mode| *mode <= 0o7777)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Directive, CompileError> {
        Directive::parse(line, &SourceLocation::new("s.lrc", 4))
    }

    #[test]
    fn set_splits_on_first_equals() {
        assert_eq!(
            parse("@set URL = a=b").unwrap(),
            Directive::Set {
                name: "URL".into(),
                value: "a=b".into()
            }
        );
    }

    #[test]
    fn set_rejects_bad_name() {
        assert!(parse("@set 9X=1").is_err());
        assert!(parse("@set X").is_err());
    }

    #[test]
    fn ignore_accepts_several_globs() {
        assert_eq!(
            parse("@ignore *.tmp *.log").unwrap(),
            Directive::Ignore {
                globs: vec!["*.tmp".into(), "*.log".into()]
            }
        );
        assert!(parse("@ignore").is_err());
    }

    #[test]
    fn chmod_parses_mode() {
        assert_eq!(
            parse("@chmod bin/run 0755").unwrap(),
            Directive::Chmod {
                path: "bin/run".into(),
                mode: 0o755
            }
        );
        assert!(parse("@chmod bin/run 999").is_err());
        assert!(parse("@chmod bin/run").is_err());
    }

    #[test]
    fn copy_and_symlink_need_two_arguments() {
        assert!(parse("@copy a").is_err());
        assert!(parse("@symlink a b c").is_err());
        assert_eq!(
            parse("@symlink ../shared link").unwrap(),
            Directive::Symlink {
                target: "../shared".into(),
                link: "link".into()
            }
        );
    }

    #[test]
    fn unknown_keyword_reports_token() {
        let err = parse("@frobnicate x").unwrap_err();
        assert_eq!(
            err.to_string(),
            "s.lrc:4: unknown directive `@frobnicate` (at `@frobnicate x`)"
        );
    }

    #[test]
    fn mode_upper_bound() {
        assert_eq!(parse_mode("7777"), Some(0o7777));
        assert_eq!(parse_mode("17777"), None);
        assert_eq!(parse_mode("0o"), None);
    }
}

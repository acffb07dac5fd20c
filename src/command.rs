//! Command parsing
//!
//! One command per input line, mirroring the dashboard's `:` command box.

/// A parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List a resource class, optionally narrowed by sub-resource ids
    List { class: String, sub_ids: Vec<String> },
    /// List a class with one detail call per item
    Describe { class: String, sub_ids: Vec<String> },
    /// Drop cached data for the whole project, or one class
    Refresh { class: Option<String> },
    /// Switch identity scope
    Project(String),
    /// Switch zone (`all` for every zone)
    Zone(String),
    /// Age of a cached listing
    Age { class: String, sub_ids: Vec<String> },
    Stats,
    Classes,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Empty lines yield `None`.
    pub fn parse(line: &str) -> Option<Result<Self, String>> {
        let line = line.trim().trim_start_matches(':');
        let mut words = line.split_whitespace();
        let head = words.next()?;
        let rest: Vec<String> = words.map(str::to_string).collect();

        let command = match head {
            "q" | "quit" | "exit" => Ok(Self::Quit),
            "?" | "help" => Ok(Self::Help),
            "stats" => Ok(Self::Stats),
            "classes" | "resources" => Ok(Self::Classes),
            "refresh" | "r" => Ok(Self::Refresh {
                class: rest.into_iter().next(),
            }),
            "project" | "projects" => single_arg(head, rest).map(Self::Project),
            "zone" | "zones" => single_arg(head, rest).map(Self::Zone),
            "describe" | "d" => class_with_subs(head, rest)
                .map(|(class, sub_ids)| Self::Describe { class, sub_ids }),
            "age" => class_with_subs(head, rest).map(|(class, sub_ids)| Self::Age { class, sub_ids }),
            class => Ok(Self::List {
                class: class.to_string(),
                sub_ids: rest,
            }),
        };

        Some(command)
    }
}

fn single_arg(head: &str, rest: Vec<String>) -> Result<String, String> {
    match <[String; 1]>::try_from(rest) {
        Ok([arg]) => Ok(arg),
        Err(_) => Err(format!("usage: {} <value>", head)),
    }
}

fn class_with_subs(head: &str, rest: Vec<String>) -> Result<(String, Vec<String>), String> {
    let mut rest = rest.into_iter();
    match rest.next() {
        Some(class) => Ok((class, rest.collect())),
        None => Err(format!("usage: {} <resource> [sub-ids...]", head)),
    }
}

/// Help text listing the commands
pub const HELP: &str = "\
<resource> [ids...]           list a resource class (e.g. `objects my-bucket logs/`)
describe <resource> [ids...]  list with one detail call per item
refresh [resource]            drop cached data for the project or one resource
project <id>                  switch project
zone <zone|all>               switch zone
age <resource> [ids...]       time since a listing was fetched
stats                         cache hit/miss counters
classes                       available resources
quit                          exit";

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Command {
        Command::parse(line).unwrap().unwrap()
    }

    #[test]
    fn test_blank_line_is_none() {
        assert!(Command::parse("   ").is_none());
        assert!(Command::parse(":").is_none());
    }

    #[test]
    fn test_list_with_sub_ids() {
        assert_eq!(
            parse(":objects my-bucket logs/"),
            Command::List {
                class: "objects".to_string(),
                sub_ids: vec!["my-bucket".to_string(), "logs/".to_string()],
            }
        );
    }

    #[test]
    fn test_refresh_optional_class() {
        assert_eq!(parse("refresh"), Command::Refresh { class: None });
        assert_eq!(
            parse("r buckets"),
            Command::Refresh {
                class: Some("buckets".to_string())
            }
        );
    }

    #[test]
    fn test_switches_need_exactly_one_arg() {
        assert_eq!(parse("zone all"), Command::Zone("all".to_string()));
        assert!(Command::parse("project").unwrap().is_err());
        assert!(Command::parse("project a b").unwrap().is_err());
    }

    #[test]
    fn test_describe_requires_class() {
        assert!(Command::parse("describe").unwrap().is_err());
        assert_eq!(
            parse("d buckets"),
            Command::Describe {
                class: "buckets".to_string(),
                sub_ids: vec![]
            }
        );
    }

    #[test]
    fn test_quit_aliases() {
        for line in ["q", "quit", ":exit"] {
            assert_eq!(parse(line), Command::Quit);
        }
    }
}

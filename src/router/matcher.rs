use std::collections::HashMap;

use super::controller::ROOT_PATH;
use super::table::{RouteTable, Segment};

/// The outcome of matching a concrete path against the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub pattern: String,
    pub params: HashMap<String, String>,
}

impl RouteMatch {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    fn fallback() -> Self {
        Self {
            pattern: ROOT_PATH.to_string(),
            params: HashMap::new(),
        }
    }
}

impl RouteTable {
    /// Resolves a concrete path to the best matching pattern.
    ///
    /// Exact string matches win outright. Otherwise the table is scanned in
    /// registration order: a candidate must have the same segment count,
    /// literal segments must compare equal (case-sensitive, no
    /// normalization), and capture segments bind whatever the path holds at
    /// that position — the empty string included. An unmatched path resolves
    /// to the root fallback with no parameters; that is graceful degradation,
    /// not an error.
    pub fn match_path(&self, path: &str) -> RouteMatch {
        if let Some(route) = self.exact_index(path) {
            return RouteMatch {
                pattern: route.pattern.clone(),
                params: HashMap::new(),
            };
        }

        let path_parts: Vec<&str> = path.split('/').collect();
        for route in self.routes() {
            if route.segments.len() != path_parts.len() {
                continue;
            }

            let mut params = HashMap::new();
            let mut matched = true;
            for (segment, part) in route.segments.iter().zip(&path_parts) {
                match segment {
                    Segment::Literal(literal) => {
                        if literal != part {
                            matched = false;
                            break;
                        }
                    }
                    Segment::Capture(name) => {
                        params.insert(name.clone(), (*part).to_string());
                    }
                }
            }

            if matched {
                return RouteMatch {
                    pattern: route.pattern.clone(),
                    params,
                };
            }
        }

        RouteMatch::fallback()
    }
}

#[cfg(test)]
mod tests {
    use super::RouteMatch;
    use crate::pages::PageKind;
    use crate::router::table::{RouteTable, default_route_table};

    fn table() -> RouteTable {
        default_route_table().expect("default table should build")
    }

    #[test]
    fn literal_paths_match_themselves_with_no_params() {
        let table = table();
        for path in [
            "/",
            "/auth",
            "/customer",
            "/driver/dashboard",
            "/driver/register",
        ] {
            let matched = table.match_path(path);
            assert_eq!(matched.pattern, path);
            assert!(matched.params.is_empty());
        }
    }

    #[test]
    fn capture_segments_bind_by_position() {
        let matched = table().match_path("/tracking/42");
        assert_eq!(matched.pattern, "/tracking/:id");
        assert_eq!(matched.param("id"), Some("42"));
    }

    #[test]
    fn unregistered_paths_fall_back_to_root() {
        let matched = table().match_path("/nowhere/at/all");
        assert_eq!(matched, RouteMatch::fallback());
    }

    #[test]
    fn segment_count_mismatch_never_matches() {
        // Three path segments cannot satisfy the two-segment capture pattern.
        let matched = table().match_path("/tracking/42/extra");
        assert_eq!(matched.pattern, "/");
        assert!(matched.params.is_empty());
    }

    #[test]
    fn registration_order_breaks_ties() {
        let mut table = RouteTable::new();
        table
            .register("/", PageKind::Auth)
            .expect("root should register");
        table
            .register("/trips/:first", PageKind::CustomerHome)
            .expect("first pattern should register");
        table
            .register("/trips/:second", PageKind::Tracking)
            .expect("second pattern should register");

        let matched = table.match_path("/trips/7");
        assert_eq!(matched.pattern, "/trips/:first");
        assert_eq!(matched.param("first"), Some("7"));
    }

    #[test]
    fn exact_match_takes_precedence_over_earlier_captures() {
        let mut table = RouteTable::new();
        table
            .register("/", PageKind::Auth)
            .expect("root should register");
        table
            .register("/driver/:section", PageKind::CustomerHome)
            .expect("capture pattern should register");
        table
            .register("/driver/dashboard", PageKind::DriverDashboard)
            .expect("literal pattern should register");

        // The literal registered later still wins: exact lookup runs first.
        let matched = table.match_path("/driver/dashboard");
        assert_eq!(matched.pattern, "/driver/dashboard");
        assert!(matched.params.is_empty());
    }

    #[test]
    fn captures_accept_empty_segments() {
        let matched = table().match_path("/tracking/");
        assert_eq!(matched.pattern, "/tracking/:id");
        assert_eq!(matched.param("id"), Some(""));
    }

    #[test]
    fn literal_comparison_is_case_sensitive() {
        let matched = table().match_path("/Customer");
        assert_eq!(matched.pattern, "/");
    }
}

use std::collections::HashMap;

use crate::error::{AppError, AppResult};
use crate::pages::PageKind;

/// One segment of a compiled route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Literal(String),
    Capture(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Route {
    pub(crate) pattern: String,
    pub(crate) segments: Vec<Segment>,
    pub(crate) page: PageKind,
}

/// Ordered mapping from path patterns to page kinds.
///
/// Built once at startup and immutable afterwards. Registration order is
/// significant: it is the tie-break when several patterns could match the
/// same path.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
    exact: HashMap<String, usize>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pattern. Segments starting with `:` capture by name;
    /// duplicate capture names within one pattern are a configuration error,
    /// as is registering the same pattern twice.
    pub fn register(&mut self, pattern: &str, page: PageKind) -> AppResult<()> {
        if !pattern.starts_with('/') {
            return Err(AppError::invalid_argument(format!(
                "route pattern must start with '/': {pattern}"
            )));
        }
        if self.exact.contains_key(pattern) {
            return Err(AppError::invalid_argument(format!(
                "route pattern registered twice: {pattern}"
            )));
        }

        let mut segments = Vec::new();
        let mut seen_captures: Vec<&str> = Vec::new();
        for part in pattern.split('/') {
            if let Some(name) = part.strip_prefix(':') {
                if name.is_empty() {
                    return Err(AppError::invalid_argument(format!(
                        "capture segment must be named in {pattern}"
                    )));
                }
                if seen_captures.contains(&name) {
                    return Err(AppError::invalid_argument(format!(
                        "duplicate capture name '{name}' in {pattern}"
                    )));
                }
                seen_captures.push(name);
                segments.push(Segment::Capture(name.to_string()));
            } else {
                segments.push(Segment::Literal(part.to_string()));
            }
        }

        self.exact.insert(pattern.to_string(), self.routes.len());
        self.routes.push(Route {
            pattern: pattern.to_string(),
            segments,
            page,
        });
        Ok(())
    }

    pub fn page_for(&self, pattern: &str) -> Option<PageKind> {
        self.exact.get(pattern).map(|&idx| self.routes[idx].page)
    }

    pub(crate) fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub(crate) fn exact_index(&self, path: &str) -> Option<&Route> {
        self.exact.get(path).map(|&idx| &self.routes[idx])
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// The application route table.
pub fn default_route_table() -> AppResult<RouteTable> {
    let mut table = RouteTable::new();
    table.register("/", PageKind::Auth)?;
    table.register("/auth", PageKind::Auth)?;
    table.register("/customer", PageKind::CustomerHome)?;
    table.register("/driver/dashboard", PageKind::DriverDashboard)?;
    table.register("/driver/register", PageKind::DriverDashboard)?;
    table.register("/tracking/:id", PageKind::Tracking)?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::{RouteTable, Segment, default_route_table};
    use crate::pages::PageKind;

    #[test]
    fn register_compiles_capture_segments() {
        let mut table = RouteTable::new();
        table
            .register("/tracking/:id", PageKind::Tracking)
            .expect("pattern should register");

        let route = &table.routes()[0];
        assert_eq!(route.segments[0], Segment::Literal(String::new()));
        assert_eq!(route.segments[1], Segment::Literal("tracking".to_string()));
        assert_eq!(route.segments[2], Segment::Capture("id".to_string()));
    }

    #[test]
    fn register_rejects_duplicate_capture_names() {
        let mut table = RouteTable::new();
        let err = table
            .register("/trips/:id/legs/:id", PageKind::Tracking)
            .expect_err("duplicate capture names should be rejected");
        assert!(err.to_string().contains("duplicate capture name"));
    }

    #[test]
    fn register_rejects_duplicate_patterns_and_relative_paths() {
        let mut table = RouteTable::new();
        table
            .register("/customer", PageKind::CustomerHome)
            .expect("first registration should succeed");
        assert!(table.register("/customer", PageKind::Auth).is_err());
        assert!(table.register("customer", PageKind::Auth).is_err());
    }

    #[test]
    fn default_table_contains_the_application_routes_in_order() {
        let table = default_route_table().expect("default table should build");
        assert_eq!(table.len(), 6);
        assert!(!table.is_empty());
        let patterns: Vec<&str> = table
            .routes()
            .iter()
            .map(|route| route.pattern.as_str())
            .collect();
        assert_eq!(
            patterns,
            [
                "/",
                "/auth",
                "/customer",
                "/driver/dashboard",
                "/driver/register",
                "/tracking/:id",
            ]
        );
        assert_eq!(table.page_for("/"), Some(PageKind::Auth));
        assert_eq!(table.page_for("/tracking/:id"), Some(PageKind::Tracking));
    }
}

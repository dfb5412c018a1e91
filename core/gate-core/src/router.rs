//! Location matching for the screen router.
//!
//! Hash-router locations (`#/retreat/7?tab=shop`) are matched against the
//! active route set. Ranking: static segments beat `:params`, params beat a
//! trailing `*`; equal ranks go to the earlier declaration.

use std::collections::BTreeMap;

use serde::Serialize;
use url::form_urlencoded;

use crate::routes::RouteEntry;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl Location {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim().trim_start_matches('#');
        let (path, query) = match raw.split_once('?') {
            Some((path, query)) => (path, query),
            None => (raw, ""),
        };

        Self {
            path: normalize_path(path),
            query: form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        }
    }

    pub fn query_string(&self) -> String {
        serialize_query(&self.query)
    }
}

/// Form-encodes pairs in order, keeping repeated keys.
pub fn serialize_query(query: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(query.iter())
        .finish()
}

fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteMatch {
    pub route: RouteEntry,
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Static(&'a str),
    Param(&'a str),
    Splat,
}

const STATIC_SCORE: i32 = 10;
const PARAM_SCORE: i32 = 3;
const SPLAT_PENALTY: i32 = -2;
const INDEX_BONUS: i32 = 2;

fn parse_pattern(pattern: &str) -> Vec<Segment<'_>> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s == "*" {
                Segment::Splat
            } else if let Some(name) = s.strip_prefix(':') {
                Segment::Param(name)
            } else {
                Segment::Static(s)
            }
        })
        .collect()
}

/// Matches one route. Returns its rank and captured params.
fn match_route(route: &RouteEntry, path: &str) -> Option<(i32, BTreeMap<String, String>)> {
    let pattern = parse_pattern(route.path);
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let mut params = BTreeMap::new();
    let mut score = if route.index { INDEX_BONUS } else { 0 };

    for (position, segment) in pattern.iter().enumerate() {
        match segment {
            Segment::Splat => {
                let rest = segments.get(position..).unwrap_or_default().join("/");
                params.insert("*".to_string(), rest);
                return Some((score + SPLAT_PENALTY, params));
            }
            Segment::Static(expected) => {
                if segments.get(position) != Some(expected) {
                    return None;
                }
                score += STATIC_SCORE;
            }
            Segment::Param(name) => {
                let value = segments.get(position)?;
                params.insert((*name).to_string(), (*value).to_string());
                score += PARAM_SCORE;
            }
        }
    }

    (segments.len() == pattern.len()).then_some((score, params))
}

/// Picks the single route that mounts for `location`, if any.
pub fn match_location(routes: &[RouteEntry], location: &Location) -> Option<RouteMatch> {
    let mut best: Option<(i32, RouteMatch)> = None;
    for route in routes.iter().filter(|route| route.guard) {
        if let Some((score, params)) = match_route(route, &location.path) {
            let better = best.as_ref().map_or(true, |(current, _)| score > *current);
            if better {
                best = Some((
                    score,
                    RouteMatch {
                        route: *route,
                        params,
                    },
                ));
            }
        }
    }
    best.map(|(_, matched)| matched)
}

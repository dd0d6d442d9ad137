use std::collections::HashMap;

use anyhow::Result;
use bson::{Bson, Document};

use crate::store::{EntityModel, FindSpec, Projection, REVISION_FIELD};

/// Query-string keys that steer the pipeline itself and never become filter
/// predicates.
pub const RESERVED_KEYS: [&str; 4] = ["page", "sort", "limit", "fields"];

/// Page size used when the client sends no usable `limit`. There is no upper
/// bound on a client-supplied limit.
pub const DEFAULT_PAGE_SIZE: u64 = 100;

/// Comparison suffixes rewritten into the operator form the data layer
/// expects, e.g. `price[gte]=400` becomes `{"price": {"$gte": 400}}`.
const OPERATOR_SUFFIXES: [(&str, &str); 4] = [
    ("[gte]", "$gte"),
    ("[gt]", "$gt"),
    ("[lte]", "$lte"),
    ("[lt]", "$lt"),
];

/// A pending find wrapped together with the query-string map it is being
/// restricted by.
///
/// Each stage consumes and returns the builder, so the stages compose
/// fluently; the caller runs the stages in the fixed order
/// filter → sort → project → paginate and then awaits [`run`](Self::run),
/// which consumes the builder and executes the accumulated spec:
///
/// ```ignore
/// let documents = FilteredQuery::new(&model, params)
///     .filter()
///     .sort()
///     .project()
///     .paginate()
///     .run()
///     .await?;
/// ```
pub struct FilteredQuery<'a, M: EntityModel> {
    model: &'a M,
    params: HashMap<String, String>,
    spec: FindSpec,
}

impl<'a, M: EntityModel> FilteredQuery<'a, M> {
    pub fn new(model: &'a M, params: HashMap<String, String>) -> Self {
        Self {
            model,
            params,
            spec: FindSpec::default(),
        }
    }

    /// Turns every non-reserved key into a filter predicate. Keys carrying a
    /// comparison suffix are rewritten into operator documents; several
    /// suffixed keys on the same field merge into one operator document.
    pub fn filter(mut self) -> Self {
        for (key, raw) in &self.params {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            let value = parse_scalar(raw);
            match operator_suffix(key) {
                Some((field, operator)) => {
                    let mut operators = match self.spec.filter.get(field) {
                        Some(Bson::Document(existing)) => existing.clone(),
                        _ => Document::new(),
                    };
                    operators.insert(operator, value);
                    self.spec.filter.insert(field.to_string(), operators);
                }
                None => {
                    self.spec.filter.insert(key.clone(), value);
                }
            }
        }
        self
    }

    /// Applies the comma-separated `sort` fields (`-` prefix for descending),
    /// falling back to newest-first when the client sends none.
    pub fn sort(mut self) -> Self {
        match self.params.get("sort") {
            Some(fields) if !fields.trim().is_empty() => {
                for field in fields.split(',') {
                    let field = field.trim();
                    if field.is_empty() {
                        continue;
                    }
                    match field.strip_prefix('-') {
                        Some(name) => self.spec.sort.insert(name, Bson::Int32(-1)),
                        None => self.spec.sort.insert(field, Bson::Int32(1)),
                    };
                }
            }
            _ => {
                self.spec.sort.insert("created_at", Bson::Int32(-1));
            }
        }
        self
    }

    /// Restricts returned fields to the comma-separated `fields` list, or
    /// excludes the revision bookkeeping field when no list is given.
    pub fn project(mut self) -> Self {
        match self.params.get("fields") {
            Some(fields) if !fields.trim().is_empty() => {
                let names: Vec<String> = fields
                    .split(',')
                    .map(|field| field.trim().to_string())
                    .filter(|field| !field.is_empty())
                    .collect();
                self.spec.projection = Some(Projection::Include(names));
            }
            _ => {
                self.spec.projection = Some(Projection::Exclude(vec![REVISION_FIELD.to_string()]));
            }
        }
        self
    }

    /// Computes the page window: skip = (page - 1) * limit. Page defaults to
    /// 1 and limit to [`DEFAULT_PAGE_SIZE`]; anything that is not a positive
    /// integer falls back to its default.
    pub fn paginate(mut self) -> Self {
        let page = positive_integer(self.params.get("page")).unwrap_or(1);
        let limit = positive_integer(self.params.get("limit")).unwrap_or(DEFAULT_PAGE_SIZE);
        self.spec.skip = page.saturating_sub(1).saturating_mul(limit);
        self.spec.limit = limit as i64;
        self
    }

    /// Executes the accumulated spec against the model.
    pub async fn run(self) -> Result<Vec<Document>> {
        self.model.find_all(self.spec).await
    }

    /// The restrictions applied so far.
    pub fn spec(&self) -> &FindSpec {
        &self.spec
    }
}

fn operator_suffix(key: &str) -> Option<(&str, &str)> {
    OPERATOR_SUFFIXES
        .iter()
        .find_map(|(suffix, operator)| key.strip_suffix(suffix).map(|field| (field, *operator)))
}

fn positive_integer(raw: Option<&String>) -> Option<u64> {
    raw.and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value >= 1)
}

/// Interprets a client-supplied string conservatively: it becomes a number
/// or boolean only when the parse round-trips textually, so `"400"` compares
/// numerically while `"007"` and `"+40722..."` stay strings. There is no
/// schema to cast against, so anything ambiguous is left alone.
pub(crate) fn parse_scalar(raw: &str) -> Bson {
    if let Ok(number) = raw.parse::<i64>() {
        if number.to_string() == raw {
            return Bson::Int64(number);
        }
    }
    if let Ok(number) = raw.parse::<f64>() {
        if number.to_string() == raw {
            return Bson::Double(number);
        }
    }
    match raw {
        "true" => Bson::Boolean(true),
        "false" => Bson::Boolean(false),
        _ => Bson::String(raw.to_string()),
    }
}

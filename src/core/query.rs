//! Filter expressions, ordering keys and pagination

use crate::core::entity::Model;
use crate::core::field::FieldValue;
use crate::core::prefetch::Prefetched;
use std::cmp::Ordering;

/// A predicate over entity fields.
///
/// Filters compose with [`Filter::and`], [`Filter::or`] and
/// [`Filter::negate`]. A field the entity does not declare never matches.
///
/// # Example
/// ```rust,ignore
/// let search = Filter::eq("status", "paid")
///     .and(Filter::gt("total", Decimal::new(1000, 2)))
///     .or(Filter::is_null("customer_id"));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// Matches every entity
    #[default]
    All,
    Eq(String, FieldValue),
    Ne(String, FieldValue),
    Gt(String, FieldValue),
    Ge(String, FieldValue),
    Lt(String, FieldValue),
    Le(String, FieldValue),
    In(String, Vec<FieldValue>),
    /// Substring match on string fields
    Contains(String, String),
    IsNull(String),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn ne(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Filter::Ne(field.into(), value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Filter::Gt(field.into(), value.into())
    }

    pub fn ge(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Filter::Ge(field.into(), value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Filter::Lt(field.into(), value.into())
    }

    pub fn le(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Filter::Le(field.into(), value.into())
    }

    pub fn is_in<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        Filter::In(field.into(), values.into_iter().map(Into::into).collect())
    }

    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Filter::Contains(field.into(), needle.into())
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Filter::IsNull(field.into())
    }

    /// Field-equality filter over every given pair, combined with AND
    pub fn fields<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        pairs
            .into_iter()
            .fold(Filter::All, |acc, (k, v)| acc.and(Filter::eq(k, v)))
    }

    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::All, f) | (f, Filter::All) => f,
            (Filter::And(mut left), Filter::And(right)) => {
                left.extend(right);
                Filter::And(left)
            }
            (Filter::And(mut left), f) => {
                left.push(f);
                Filter::And(left)
            }
            (f, Filter::And(mut right)) => {
                right.insert(0, f);
                Filter::And(right)
            }
            (a, b) => Filter::And(vec![a, b]),
        }
    }

    pub fn or(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::Or(mut left), Filter::Or(right)) => {
                left.extend(right);
                Filter::Or(left)
            }
            (Filter::Or(mut left), f) => {
                left.push(f);
                Filter::Or(left)
            }
            (a, b) => Filter::Or(vec![a, b]),
        }
    }

    pub fn negate(self) -> Self {
        match self {
            Filter::Not(inner) => *inner,
            f => Filter::Not(Box::new(f)),
        }
    }

    /// Evaluate this filter against an entity
    pub fn matches(&self, entity: &dyn Model) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, v) => compare(entity, field, v) == Some(Ordering::Equal),
            Filter::Ne(field, v) => {
                entity.value_of(field).is_some() && compare(entity, field, v) != Some(Ordering::Equal)
            }
            Filter::Gt(field, v) => compare(entity, field, v) == Some(Ordering::Greater),
            Filter::Ge(field, v) => matches!(
                compare(entity, field, v),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Filter::Lt(field, v) => compare(entity, field, v) == Some(Ordering::Less),
            Filter::Le(field, v) => matches!(
                compare(entity, field, v),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Filter::In(field, values) => values
                .iter()
                .any(|v| compare(entity, field, v) == Some(Ordering::Equal)),
            Filter::Contains(field, needle) => entity
                .value_of(field)
                .as_ref()
                .and_then(FieldValue::as_string)
                .is_some_and(|s| s.contains(needle.as_str())),
            Filter::IsNull(field) => entity.value_of(field).is_some_and(|v| v.is_null()),
            Filter::And(filters) => filters.iter().all(|f| f.matches(entity)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(entity)),
            Filter::Not(inner) => !inner.matches(entity),
        }
    }
}

fn compare(entity: &dyn Model, field: &str, expected: &FieldValue) -> Option<Ordering> {
    entity.value_of(field)?.compare(expected)
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// One ordering key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }

    /// Parse `"field"` (ascending) or `"-field"` (descending)
    pub fn parse(key: &str) -> Self {
        match key.strip_prefix('-') {
            Some(field) => Self::desc(field),
            None => Self::asc(key.strip_prefix('+').unwrap_or(key)),
        }
    }

    /// Compare two entities by a list of ordering keys, first key first
    pub fn compare_by(keys: &[OrderBy], a: &dyn Model, b: &dyn Model) -> Ordering {
        for key in keys {
            let left = a.value_of(&key.field).unwrap_or(FieldValue::Null);
            let right = b.value_of(&key.field).unwrap_or(FieldValue::Null);
            let ord = left.compare(&right).unwrap_or(Ordering::Equal);
            let ord = match key.direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl From<&str> for OrderBy {
    fn from(key: &str) -> Self {
        OrderBy::parse(key)
    }
}

/// A filtered, ordered, optionally sliced scan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Filter,
    pub order: Vec<OrderBy>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn order_by(mut self, order: impl IntoIterator<Item = OrderBy>) -> Self {
        self.order = order.into_iter().collect();
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Apply ordering and the offset/limit window to already filtered rows
    pub fn window<E: Model>(&self, mut rows: Vec<E>) -> Vec<E> {
        if !self.order.is_empty() {
            rows.sort_by(|a, b| OrderBy::compare_by(&self.order, a, b));
        }
        let rows = rows.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => rows.take(limit).collect(),
            None => rows.collect(),
        }
    }
}

/// One page of a paginated listing.
///
/// `total` counts every entity matching the search regardless of paging;
/// `related` holds the relations requested for eager loading.
pub struct Page<E> {
    pub total: usize,
    pub items: Vec<E>,
    pub related: Prefetched,
    pub page: usize,
    pub page_size: usize,
}

impl<E> Page<E> {
    /// Total number of pages
    pub fn total_pages(&self) -> usize {
        if self.total == 0 || self.page_size == 0 {
            0
        } else {
            self.total.div_ceil(self.page_size)
        }
    }

    /// Whether there is a next page
    pub fn has_next(&self) -> bool {
        self.page * self.page_size < self.total
    }

    /// Whether there is a previous page
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

impl<E: std::fmt::Debug> std::fmt::Debug for Page<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("total", &self.total)
            .field("page", &self.page)
            .field("page_size", &self.page_size)
            .field("items", &self.items)
            .finish_non_exhaustive()
    }
}

//! Structured search criteria and the page cursor that drives pagination.
//!
//! # Design
//! The platform filters and pages collection endpoints through bracketed
//! query parameters (`searchCriteria[filter_groups][0][filters][0][field]=sku`).
//! `SearchCriteria` is the only way this crate builds them. Keys, field names
//! and condition tokens are wire literals and are emitted unchanged; only
//! filter values are percent-encoded. Filters inside one group are OR-ed by
//! the platform and groups are AND-ed.

use uuid::Uuid;

/// Page size used when none (or zero) is requested.
pub const DEFAULT_PAGE_SIZE: u32 = 200;

/// Field that correlates bulk status lookups with a submission.
pub const BULK_UUID_FIELD: &str = "bulk_uuid";

/// Filter comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionType {
    Eq,
    Neq,
    Like,
    Nlike,
    In,
    Nin,
    NotNull,
    Null,
    Gt,
    Lt,
    Gteq,
    Lteq,
    From,
    To,
    Finset,
    Moreq,
}

impl ConditionType {
    pub fn as_str(self) -> &'static str {
        match self {
            ConditionType::Eq => "eq",
            ConditionType::Neq => "neq",
            ConditionType::Like => "like",
            ConditionType::Nlike => "nlike",
            ConditionType::In => "in",
            ConditionType::Nin => "nin",
            ConditionType::NotNull => "notnull",
            ConditionType::Null => "null",
            ConditionType::Gt => "gt",
            ConditionType::Lt => "lt",
            ConditionType::Gteq => "gteq",
            ConditionType::Lteq => "lteq",
            ConditionType::From => "from",
            ConditionType::To => "to",
            ConditionType::Finset => "finset",
            ConditionType::Moreq => "moreq",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: String,
    pub value: String,
    pub condition_type: ConditionType,
}

impl Filter {
    pub fn new(field: impl Into<String>, value: impl Into<String>, condition_type: ConditionType) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            condition_type,
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, value, ConditionType::Eq)
    }
}

/// Filters OR-ed together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterGroup {
    pub filters: Vec<Filter>,
}

impl FilterGroup {
    pub fn new(filters: Vec<Filter>) -> Self {
        Self { filters }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrder {
    pub field: String,
    pub direction: SortDirection,
}

/// Filter groups AND-ed together, plus sorting and paging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    pub filter_groups: Vec<FilterGroup>,
    pub sort_orders: Vec<SortOrder>,
    pub page_size: Option<u32>,
    pub current_page: Option<u32>,
}

impl SearchCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Criteria selecting the page `cursor` points at.
    pub fn for_page(cursor: &PageCursor) -> Self {
        Self::new().with_page(cursor)
    }

    /// Criteria selecting the bulk batch tagged `bulk_id`.
    pub fn bulk_uuid(bulk_id: Uuid) -> Self {
        Self::new().filter(Filter::eq(BULK_UUID_FIELD, bulk_id.to_string()))
    }

    /// Add a group holding a single filter.
    #[must_use]
    pub fn filter(self, filter: Filter) -> Self {
        self.group(FilterGroup::new(vec![filter]))
    }

    #[must_use]
    pub fn group(mut self, group: FilterGroup) -> Self {
        self.filter_groups.push(group);
        self
    }

    #[must_use]
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort_orders.push(SortOrder {
            field: field.into(),
            direction,
        });
        self
    }

    #[must_use]
    pub fn with_page(mut self, cursor: &PageCursor) -> Self {
        self.page_size = Some(cursor.page_size());
        self.current_page = Some(cursor.current_page());
        self
    }

    /// Serialize as a query string without the leading `?`.
    pub fn to_query_string(&self) -> String {
        let mut params = Vec::new();
        for (g, group) in self.filter_groups.iter().enumerate() {
            for (f, filter) in group.filters.iter().enumerate() {
                let prefix = format!("searchCriteria[filter_groups][{g}][filters][{f}]");
                params.push(format!("{prefix}[field]={}", filter.field));
                params.push(format!("{prefix}[value]={}", urlencoding::encode(&filter.value)));
                params.push(format!(
                    "{prefix}[condition_type]={}",
                    filter.condition_type.as_str()
                ));
            }
        }
        for (i, order) in self.sort_orders.iter().enumerate() {
            params.push(format!("searchCriteria[sortOrders][{i}][field]={}", order.field));
            params.push(format!(
                "searchCriteria[sortOrders][{i}][direction]={}",
                order.direction.as_str()
            ));
        }
        if let Some(size) = self.page_size {
            params.push(format!("searchCriteria[page_size]={size}"));
        }
        if let Some(page) = self.current_page {
            params.push(format!("searchCriteria[current_page]={page}"));
        }
        params.join("&")
    }
}

/// Position within a paged collection. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    page_size: u32,
    current_page: u32,
}

impl PageCursor {
    /// `None` or zero falls back to [`DEFAULT_PAGE_SIZE`].
    pub fn new(page_size: Option<u32>) -> Self {
        Self {
            page_size: page_size.filter(|&n| n > 0).unwrap_or(DEFAULT_PAGE_SIZE),
            current_page: 1,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn advance(&mut self) {
        self.current_page = self.current_page.saturating_add(1);
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::new(None)
    }
}

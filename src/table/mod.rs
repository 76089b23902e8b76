//! Table projection
//!
//! Search, sort and paginate already-fetched table rows in memory.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::Serialize;

use crate::db::TableRow;

/// Default number of rows per page
pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    ObjectiveId,
    ObjectiveName,
    PracticeId,
    PracticeName,
    ActivityId,
    ActivityDescription,
    CapabilityLevel,
    ToolId,
    ToolName,
    ToolCategory,
    Justification,
    Observations,
    Integration,
}

impl FromStr for SortField {
    type Err = String;

    /// Accepts the camelCase wire name of the column
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "objectiveId" => Ok(Self::ObjectiveId),
            "objectiveName" => Ok(Self::ObjectiveName),
            "practiceId" => Ok(Self::PracticeId),
            "practiceName" => Ok(Self::PracticeName),
            "activityId" => Ok(Self::ActivityId),
            "activityDescription" => Ok(Self::ActivityDescription),
            "capabilityLevel" => Ok(Self::CapabilityLevel),
            "toolId" => Ok(Self::ToolId),
            "toolName" => Ok(Self::ToolName),
            "toolCategory" => Ok(Self::ToolCategory),
            "justification" => Ok(Self::Justification),
            "observations" => Ok(Self::Observations),
            "integration" => Ok(Self::Integration),
            other => Err(format!("Unknown sort field: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("Unknown sort direction: {}", other)),
        }
    }
}

/// View options for one table request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableQuery {
    pub search: Option<String>,
    pub sort: Option<(SortField, SortDirection)>,
    /// 1-based page; `None` returns every matching row
    pub page: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableView {
    pub data: Vec<TableRow>,
    /// Rows matching the search, before paging
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

fn text_columns(row: &TableRow) -> [Option<&str>; 12] {
    [
        Some(row.objective_id.as_str()),
        Some(row.objective_name.as_str()),
        Some(row.practice_id.as_str()),
        Some(row.practice_name.as_str()),
        Some(row.activity_id.as_str()),
        Some(row.activity_description.as_str()),
        row.tool_id.as_deref(),
        row.tool_name.as_deref(),
        row.tool_category.as_deref(),
        row.justification.as_deref(),
        row.observations.as_deref(),
        row.integration.as_deref(),
    ]
}

/// Case-insensitive substring match on any text column or the level
pub fn matches_search(row: &TableRow, needle_lower: &str) -> bool {
    if needle_lower.is_empty() {
        return true;
    }
    text_columns(row)
        .into_iter()
        .flatten()
        .any(|value| value.to_lowercase().contains(needle_lower))
        || row.capability_level.to_string().contains(needle_lower)
}

fn compare_text(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_by(field: SortField, a: &TableRow, b: &TableRow) -> Ordering {
    let required = |get: fn(&TableRow) -> &str| compare_text(Some(get(a)), Some(get(b)));
    let optional = |get: fn(&TableRow) -> Option<&str>| compare_text(get(a), get(b));

    match field {
        SortField::CapabilityLevel => a.capability_level.cmp(&b.capability_level),
        SortField::ObjectiveId => required(|r| r.objective_id.as_str()),
        SortField::ObjectiveName => required(|r| r.objective_name.as_str()),
        SortField::PracticeId => required(|r| r.practice_id.as_str()),
        SortField::PracticeName => required(|r| r.practice_name.as_str()),
        SortField::ActivityId => required(|r| r.activity_id.as_str()),
        SortField::ActivityDescription => required(|r| r.activity_description.as_str()),
        SortField::ToolId => optional(|r| r.tool_id.as_deref()),
        SortField::ToolName => optional(|r| r.tool_name.as_deref()),
        SortField::ToolCategory => optional(|r| r.tool_category.as_deref()),
        SortField::Justification => optional(|r| r.justification.as_deref()),
        SortField::Observations => optional(|r| r.observations.as_deref()),
        SortField::Integration => optional(|r| r.integration.as_deref()),
    }
}

#[derive(Debug, Clone)]
pub struct TableProjector {
    page_size: usize,
}

impl Default for TableProjector {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl TableProjector {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Filter, sort (stable, ties keep input order) and page `rows`.
    ///
    /// A page past the end is clamped to the last page.
    pub fn project(&self, rows: &[TableRow], query: &TableQuery) -> TableView {
        let needle = query
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .unwrap_or_default();

        let mut matched: Vec<&TableRow> = rows.iter().filter(|r| matches_search(r, &needle)).collect();

        if let Some((field, direction)) = query.sort {
            matched.sort_by(|a, b| {
                let ordering = compare_by(field, a, b);
                match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        let total = matched.len();
        let Some(requested) = query.page else {
            return TableView {
                data: matched.into_iter().cloned().collect(),
                total,
                page: 1,
                page_size: total,
                total_pages: usize::from(total > 0),
            };
        };

        let total_pages = total.div_ceil(self.page_size);
        let page = requested.clamp(1, total_pages.max(1));
        let data = matched
            .into_iter()
            .skip((page - 1) * self.page_size)
            .take(self.page_size)
            .cloned()
            .collect();

        TableView {
            data,
            total,
            page,
            page_size: self.page_size,
            total_pages,
        }
    }
}

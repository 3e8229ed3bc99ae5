use super::DealScope;
use crate::workflows::funnel::domain::{CurrentStage, Deal, RepDirectory, StageTable};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Deal properties requested besides the stage-entry timestamps.
const BASE_PROPERTIES: [&str; 10] = [
    "dealname",
    "dealstage",
    "hubspot_owner_id",
    "createdate",
    "closedate",
    "hs_lastmodifieddate",
    "amount",
    "lost_reason",
    "lost_description",
    "closed_lost_reason",
];

pub(crate) const SEARCH_PAGE_SIZE: u32 = 100;

pub(crate) fn search_properties(stages: &StageTable) -> Vec<String> {
    BASE_PROPERTIES
        .iter()
        .copied()
        .chain(stages.entered_properties())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealRecord {
    pub id: String,
    #[serde(default)]
    pub properties: HashMap<String, Option<String>>,
}

impl DealRecord {
    fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .get(name)
            .and_then(Option::as_deref)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn into_deal(self, stages: &StageTable) -> Deal {
        let entered: BTreeMap<_, _> = stages
            .fields()
            .iter()
            .filter_map(|field| {
                self.property(&field.entered_property)
                    .map(|timestamp| (field.stage, timestamp.to_string()))
            })
            .collect();

        let current_stage = match self.property("dealstage") {
            Some(stage_id) => stages
                .stage_for_id(stage_id)
                .map(CurrentStage::Known)
                .unwrap_or_else(|| CurrentStage::Other(stage_id.to_string())),
            None => CurrentStage::Other("?".to_string()),
        };

        let lost_reason = self
            .property("lost_reason")
            .or_else(|| self.property("closed_lost_reason"))
            .map(str::to_string);

        Deal {
            name: self.property("dealname").unwrap_or("?").to_string(),
            current_stage,
            owner_id: self.property("hubspot_owner_id").map(str::to_string),
            lost_reason,
            lost_description: self.property("lost_description").map(str::to_string),
            entered,
            id: self.id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerRecord {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl OwnerRecord {
    pub fn display_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        )
        .trim()
        .to_string()
    }
}

pub fn owner_directory<'a, I>(owners: I) -> RepDirectory
where
    I: IntoIterator<Item = &'a OwnerRecord>,
{
    owners
        .into_iter()
        .map(|owner| (owner.id.clone(), owner.display_name()))
        .collect()
}

#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    #[serde(default = "Vec::new")]
    pub(crate) results: Vec<T>,
    #[serde(default)]
    paging: Option<Paging>,
}

impl<T> Page<T> {
    pub(crate) fn next_cursor(&self) -> Option<String> {
        self.paging
            .as_ref()
            .and_then(|paging| paging.next.as_ref())
            .map(|next| next.after.clone())
            .filter(|after| !after.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct Paging {
    #[serde(default)]
    next: Option<NextPage>,
}

#[derive(Debug, Deserialize)]
struct NextPage {
    after: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchRequest<'a> {
    filter_groups: Vec<FilterGroup<'a>>,
    properties: &'a [String],
    sorts: Vec<SearchSort>,
    limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    after: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct FilterGroup<'a> {
    filters: Vec<SearchFilter<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchFilter<'a> {
    property_name: &'a str,
    operator: &'a str,
    value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchSort {
    property_name: &'static str,
    direction: &'static str,
}

impl<'a> SearchRequest<'a> {
    pub(crate) fn new(
        pipeline_id: &'a str,
        scope: DealScope,
        properties: &'a [String],
        after: Option<&'a str>,
    ) -> Self {
        let mut filters = vec![SearchFilter {
            property_name: "pipeline",
            operator: "EQ",
            value: pipeline_id.to_string(),
        }];

        if let DealScope::ModifiedOn(day) = scope {
            let day = day.format("%Y-%m-%d");
            filters.push(SearchFilter {
                property_name: "hs_lastmodifieddate",
                operator: "GTE",
                value: format!("{day}T00:00:00.000Z"),
            });
            filters.push(SearchFilter {
                property_name: "hs_lastmodifieddate",
                operator: "LTE",
                value: format!("{day}T23:59:59.999Z"),
            });
        }

        Self {
            filter_groups: vec![FilterGroup { filters }],
            properties,
            sorts: vec![SearchSort {
                property_name: "hs_lastmodifieddate",
                direction: "DESCENDING",
            }],
            limit: SEARCH_PAGE_SIZE,
            after,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::funnel::domain::Stage;
    use chrono::NaiveDate;
    use serde_json::json;

    fn record(properties: serde_json::Value) -> DealRecord {
        serde_json::from_value(json!({ "id": "42", "properties": properties }))
            .expect("valid record")
    }

    #[test]
    fn record_maps_stage_entries_and_loss_fields() {
        let deal = record(json!({
            "dealname": "Acme sp. z o.o.",
            "dealstage": "3938055393",
            "hubspot_owner_id": "77",
            "hs_v2_date_entered_344689645": "2026-02-01T10:00:00Z",
            "hs_v2_date_entered_344689652": "",
            "hs_v2_date_entered_3938055393": "2026-02-03T12:00:00.120Z",
            "lost_reason": null,
            "closed_lost_reason": "Budget",
            "lost_description": "  ",
        }))
        .into_deal(&StageTable::sdr_pipeline());

        assert_eq!(deal.id, "42");
        assert_eq!(deal.name, "Acme sp. z o.o.");
        assert_eq!(deal.current_stage, CurrentStage::Known(Stage::SalesLost));
        assert_eq!(deal.owner_id.as_deref(), Some("77"));
        assert_eq!(
            deal.entered.keys().copied().collect::<Vec<_>>(),
            vec![Stage::NewLead, Stage::SalesLost]
        );
        assert_eq!(deal.lost_reason.as_deref(), Some("Budget"));
        assert_eq!(deal.lost_description, None);
    }

    #[test]
    fn unknown_stage_id_is_kept_verbatim() {
        let deal = record(json!({ "dealstage": "closedwon" })).into_deal(&StageTable::sdr_pipeline());
        assert_eq!(deal.current_stage, CurrentStage::Other("closedwon".into()));
        assert_eq!(deal.name, "?");
        assert!(deal.entered.is_empty());
    }

    #[test]
    fn owner_names_are_trimmed() {
        let owners: Vec<OwnerRecord> = serde_json::from_value(json!([
            { "id": "1", "firstName": "Ann", "lastName": "Nowak" },
            { "id": "2", "firstName": "Bob" },
            { "id": "3" },
        ]))
        .expect("owners parse");
        let directory = owner_directory(&owners);
        assert_eq!(directory.resolve(Some("1")), "Ann Nowak");
        assert_eq!(directory.resolve(Some("2")), "Bob");
        assert_eq!(directory.resolve(Some("3")), "");
    }

    #[test]
    fn daily_search_filters_on_last_modified_window() {
        let properties = search_properties(&StageTable::sdr_pipeline());
        let day = NaiveDate::from_ymd_opt(2026, 2, 1).expect("valid date");
        let request = SearchRequest::new("194381550", DealScope::ModifiedOn(day), &properties, None);
        let value = serde_json::to_value(&request).expect("serialize");

        let filters = &value["filterGroups"][0]["filters"];
        assert_eq!(filters[0]["propertyName"], "pipeline");
        assert_eq!(filters[0]["value"], "194381550");
        assert_eq!(filters[1]["value"], "2026-02-01T00:00:00.000Z");
        assert_eq!(filters[2]["operator"], "LTE");
        assert_eq!(value["limit"], 100);
        assert!(value.get("after").is_none());
        assert_eq!(properties.len(), 18);
    }

    #[test]
    fn pipeline_search_carries_cursor() {
        let properties = search_properties(&StageTable::sdr_pipeline());
        let request =
            SearchRequest::new("194381550", DealScope::EntirePipeline, &properties, Some("200"));
        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["filterGroups"][0]["filters"].as_array().map(Vec::len), Some(1));
        assert_eq!(value["after"], "200");
        assert_eq!(value["sorts"][0]["direction"], "DESCENDING");
    }

    #[test]
    fn page_cursor_is_optional() {
        let page: Page<DealRecord> = serde_json::from_value(json!({
            "results": [],
            "paging": { "next": { "after": "100" } }
        }))
        .expect("page parses");
        assert_eq!(page.next_cursor().as_deref(), Some("100"));

        let last: Page<DealRecord> =
            serde_json::from_value(json!({ "results": [] })).expect("page parses");
        assert!(last.next_cursor().is_none());
    }
}

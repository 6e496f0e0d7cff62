//! The incident-warehouse star schema
//!
//! The concrete layout this loader was built for: a central `incidents`
//! fact table referencing six dimensions. District, resolution, category
//! and location are shared (low cardinality, deduplicated); date and
//! incident details are per-row (one row per incident).

use warehouse_db::{ColumnDef, DimensionSpec, StarSchema};

/// Builds the incident warehouse schema.
pub fn incident_schema() -> StarSchema {
    StarSchema::new(
        "incidents",
        vec![
            DimensionSpec::per_row(
                "date_dimension",
                "date_key",
                vec![
                    ColumnDef::timestamp("incident_datetime"),
                    ColumnDef::date("incident_date"),
                    ColumnDef::time("incident_time"),
                    ColumnDef::int("incident_year"),
                    ColumnDef::text("incident_day_of_week"),
                    ColumnDef::timestamp("report_datetime"),
                ],
            ),
            DimensionSpec::shared(
                "category_dimension",
                "category_key",
                vec![
                    ColumnDef::text("incident_category"),
                    ColumnDef::text("incident_subcategory"),
                    ColumnDef::int("incident_code"),
                ],
            ),
            DimensionSpec::shared(
                "district_dimension",
                "district_key",
                vec![
                    ColumnDef::text("police_district"),
                    ColumnDef::text("analysis_neighborhood"),
                ],
            ),
            DimensionSpec::shared(
                "resolution_dimension",
                "resolution_key",
                vec![ColumnDef::text("resolution")],
            ),
            DimensionSpec::shared(
                "location_dimension",
                "location_key",
                vec![ColumnDef::float("latitude"), ColumnDef::float("longitude")],
            ),
            DimensionSpec::per_row(
                "incident_details_dimension",
                "incident_details_key",
                vec![
                    ColumnDef::int("incident_number"),
                    ColumnDef::text("incident_description"),
                ],
            ),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incident_schema_has_the_expected_shape() {
        let schema = incident_schema();

        assert_eq!(schema.fact_table(), "incidents");
        assert_eq!(schema.dimensions().len(), 6);
        assert_eq!(schema.shared_dimensions().count(), 4);
        assert_eq!(schema.per_row_dimensions().count(), 2);

        let fact_columns: Vec<_> = schema
            .dimensions()
            .iter()
            .map(|spec| spec.fact_key_column())
            .collect();
        assert_eq!(
            fact_columns,
            [
                "date_key",
                "category_key",
                "district_key",
                "resolution_key",
                "location_key",
                "incident_details_key",
            ]
        );
    }
}

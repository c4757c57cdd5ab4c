//! Fixed extraction plans for the property export
//!
//! Every output table is described by one [`EntitySpec`]; the flattener has
//! a single routine that executes any of them. Field names on the left of
//! each pair are the raw export's, on the right the relational column.

use crate::melt::coerce::Coerce;

/// Raw field carrying the property title, source of the natural key
pub const TITLE_FIELD: &str = "Property_Title";

/// Cleaned title column on tables that keep it
pub const TITLE_COLUMN: &str = "property_title";

/// Where the rows of a table come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSource {
    /// One row per raw record, built from top-level fields
    Record,
    /// One row per object element of the named array field
    Explode(&'static str),
}

/// Which rows survive projection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFilter {
    All,
    /// Drop the row when every listed column is missing
    AnyPresent(&'static [&'static str]),
}

/// Extraction plan for one output table
#[derive(Debug, Clone, Copy)]
pub struct EntitySpec {
    pub table: &'static str,

    pub source: RowSource,

    /// (raw field, column) pairs. For [`RowSource::Record`] this is the
    /// selection; for [`RowSource::Explode`] it is a rename map and element
    /// fields not listed keep their name.
    pub fields: &'static [(&'static str, &'static str)],

    /// Coercions keyed by output column
    pub coerce: &'static [(&'static str, Coerce)],

    /// Emit the trimmed title as `property_title`
    pub keep_title: bool,

    pub filter: RowFilter,

    /// Keep only the first row per natural key
    pub unique_key: bool,

    /// Columns the flattener produces but the store does not take
    pub transient: &'static [&'static str],
}

impl EntitySpec {
    /// Declared output columns, natural key first
    pub fn columns(&self) -> Vec<&'static str> {
        let mut columns = vec![crate::melt::types::EXTERNAL_ID];
        if self.keep_title {
            columns.push(TITLE_COLUMN);
        }
        columns.extend(self.fields.iter().map(|(_, column)| *column));
        columns
    }
}

pub const PROPERTIES: EntitySpec = EntitySpec {
    table: "properties",
    source: RowSource::Record,
    fields: &[
        ("Address", "address"),
        ("Market", "market"),
        ("Flood", "flood"),
        ("Street_Address", "street_address"),
        ("City", "city"),
        ("State", "state"),
        ("Zip", "zip"),
        ("Property_Type", "property_type"),
        ("Highway", "highway"),
        ("Train", "train"),
        ("Tax_Rate", "tax_rate"),
        ("SQFT_Basement", "sqft_basement"),
        ("HTW", "htw"),
        ("Pool", "pool"),
        ("Commercial", "commercial"),
        ("Water", "water"),
        ("Sewage", "sewage"),
        ("Year_Built", "year_built"),
        ("SQFT_MU", "sqft_mu"),
        ("SQFT_Total", "sqft_total"),
        ("Parking", "parking"),
        ("Bed", "bed"),
        ("Bath", "bath"),
        ("BasementYesNo", "basement_yes_no"),
        ("Layout", "layout"),
        ("Rent_Restricted", "rent_restricted"),
        ("Neighborhood_Rating", "neighborhood_rating"),
        ("Latitude", "latitude"),
        ("Longitude", "longitude"),
        ("Subdivision", "subdivision"),
        ("School_Average", "school_average"),
    ],
    coerce: &[("sqft_total", Coerce::Measure { unit: "sqft" })],
    keep_title: true,
    filter: RowFilter::All,
    unique_key: true,
    transient: &[],
};

pub const LEADS: EntitySpec = EntitySpec {
    table: "leads",
    source: RowSource::Record,
    fields: &[
        ("Reviewed_Status", "reviewed_status"),
        ("Most_Recent_Status", "most_recent_status"),
        ("Source", "source"),
        ("Occupancy", "occupancy"),
        ("Net_Yield", "net_yield"),
        ("IRR", "irr"),
        ("Selling_Reason", "selling_reason"),
        ("Seller_Retained_Broker", "seller_retained_broker"),
        ("Final_Reviewer", "final_reviewer"),
    ],
    coerce: &[],
    keep_title: true,
    filter: RowFilter::AnyPresent(&[
        "reviewed_status",
        "most_recent_status",
        "source",
        "net_yield",
        "irr",
        "selling_reason",
        "final_reviewer",
    ]),
    unique_key: true,
    transient: &[TITLE_COLUMN],
};

pub const VALUATION: EntitySpec = EntitySpec {
    table: "valuation",
    source: RowSource::Explode("Valuation"),
    fields: &[
        ("List_Price", "list_price"),
        ("Previous_Rent", "previous_rent"),
        ("Zestimate", "zestimate"),
        ("ARV", "arv"),
        ("Expected_Rent", "expected_rent"),
        ("Rent_Zestimate", "rent_zestimate"),
        ("Low_FMR", "low_fmr"),
        ("High_FMR", "high_fmr"),
        ("Redfin_Value", "redfin_value"),
    ],
    coerce: &[
        ("list_price", Coerce::Number),
        ("previous_rent", Coerce::Number),
        ("zestimate", Coerce::Number),
        ("arv", Coerce::Number),
        ("expected_rent", Coerce::Number),
        ("rent_zestimate", Coerce::Number),
        ("low_fmr", Coerce::Number),
        ("high_fmr", Coerce::Number),
        ("redfin_value", Coerce::Number),
    ],
    keep_title: false,
    filter: RowFilter::All,
    unique_key: false,
    transient: &[],
};

pub const HOA: EntitySpec = EntitySpec {
    table: "hoa",
    source: RowSource::Explode("HOA"),
    fields: &[("HOA", "hoa_amount"), ("HOA_Flag", "hoa_flag")],
    coerce: &[("hoa_amount", Coerce::Number)],
    keep_title: false,
    filter: RowFilter::All,
    unique_key: false,
    transient: &[],
};

pub const REHAB: EntitySpec = EntitySpec {
    table: "rehab",
    source: RowSource::Explode("Rehab"),
    fields: &[
        ("Underwriting_Rehab", "underwriting_rehab"),
        ("Rehab_Calculation", "rehab_calculation"),
        ("Paint", "paint"),
        ("Flooring_Flag", "flooring_flag"),
        ("Foundation_Flag", "foundation_flag"),
        ("Roof_Flag", "roof_flag"),
        ("HVAC_Flag", "hvac_flag"),
        ("Kitchen_Flag", "kitchen_flag"),
        ("Bathroom_Flag", "bathroom_flag"),
        ("Appliances_Flag", "appliances_flag"),
        ("Windows_Flag", "windows_flag"),
        ("Landscaping_Flag", "landscaping_flag"),
        ("Trashout_Flag", "trashout_flag"),
    ],
    coerce: &[
        ("underwriting_rehab", Coerce::Number),
        ("rehab_calculation", Coerce::Number),
    ],
    keep_title: false,
    filter: RowFilter::All,
    unique_key: false,
    transient: &[],
};

/// Keyed by the trimmed title like every other table, so a padded title
/// still joins to its property
pub const TAXES: EntitySpec = EntitySpec {
    table: "taxes",
    source: RowSource::Record,
    fields: &[("Taxes", "taxes_amount")],
    coerce: &[("taxes_amount", Coerce::Number)],
    keep_title: false,
    filter: RowFilter::AnyPresent(&["taxes_amount"]),
    unique_key: true,
    transient: &[],
};

/// Child tables in load order
pub const CHILDREN: [&EntitySpec; 5] = [&LEADS, &VALUATION, &HOA, &REHAB, &TAXES];

/// Look up the plan of a child table by name
pub fn child_spec(table: &str) -> Option<&'static EntitySpec> {
    CHILDREN.iter().copied().find(|spec| spec.table == table)
}

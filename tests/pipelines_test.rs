use anyhow::Result;
use chrono::NaiveDate;
use serde_json::json;

use retail_etl::infra::object_store::{parse_csv, parse_json};
use retail_etl::pipeline::{default_plans, plan};
use retail_etl::table::{Cell, Column, Table};

fn text_column(name: &str, values: &[Option<&str>]) -> Column {
    Column::new(
        name,
        values.iter().map(|v| v.map(Cell::text).unwrap_or(Cell::Null)).collect(),
    )
}

fn legacy_users() -> Table {
    let codes = [Some("GB"), Some("GGB"), Some("US"), Some("DE"), Some("FR"), None];
    Table::from_columns(
        "legacy_users",
        vec![
            Column::new("index", (0..6).map(Cell::Int).collect()),
            text_column("first_name", &[Some("Ada"); 6]),
            text_column("country_code", &codes),
            text_column("date_of_birth", &[Some("1968-10-16"); 6]),
            text_column(
                "join_date",
                &[
                    Some("2001 May 03"),
                    Some("bad"),
                    Some("2010-01-01"),
                    Some("June 1991 28"),
                    Some("2020-02-02"),
                    Some("2020-02-02"),
                ],
            ),
        ],
    )
    .unwrap()
}

fn raw_cards() -> Result<Table> {
    Ok(Table::from_columns(
        "cards",
        vec![
            text_column("card_number", &[Some("30060773296197"), Some("NULL"), Some("4971858637664481")]),
            text_column("expiry_date", &[Some("09/26"), Some("NULL"), Some("13/99")]),
            text_column(
                "card_provider",
                &[Some("Diners Club / Carte Blanche"), Some("NULL"), Some("VISA 16 digit")],
            ),
            text_column(
                "date_payment_confirmed",
                &[Some("2015-11-25"), Some("NULL"), Some("October 2001 18")],
            ),
        ],
    )?)
}

fn raw_stores() -> Result<Table> {
    let records = vec![
        json!({"index": 0, "lat": null, "continent": "Europe", "country_code": "GB",
               "staff_numbers": "J78", "opening_date": "2006-03-13"}),
        json!({"index": 1, "lat": null, "continent": "eeEurope", "country_code": "DE",
               "staff_numbers": "34", "opening_date": "October 2012 08"}),
        json!({"index": 2, "lat": "13KJZ890JH", "continent": "QMAVR5H3LD", "country_code": "LMSRQPKMBP",
               "staff_numbers": "A97", "opening_date": "7AHXLXUW2L"}),
        json!({"index": 3, "lat": null, "continent": "America", "country_code": "US",
               "staff_numbers": "n/a", "opening_date": "2001-01-01"}),
    ];
    Ok(Table::from_records("stores", &records)?)
}

fn raw_products() -> Result<Table> {
    let csv = "\
,product_name,product_price,weight,category,EAN,date_added,uuid,removed,product_code
0,FurReal Dazzlin' Dimples,£39.99,1.6kg,toys-and-games,7425710935115,2005-12-02,83dc0a69,Still_avaliable,R7-3126933h
1,Tiffany Lamp,£79.89,12 x 100g,homeware,1945816904649,2006-09-28,712254d7,Still_avaliable,C3-7044049C
2,VSTRQ1,VSTRQ1,VSTRQ1,S1YB74MLMJ,VSTRQ1,VSTRQ1,VSTRQ1,VSTRQ1,VSTRQ1
3,Dog Shampoo,£9.99,250ml,pets,5000203484785,2018 October 21,aaaa,Still_avaliable,P9-1111
4,Cat Toy,£1.99,77  .,pets,5000203484786,2019-01-01,bbbb,Still_avaliable,P9-2222
";
    Ok(parse_csv("products.csv", csv.as_bytes())?)
}

fn raw_date_events() -> Result<Table> {
    let json = br#"{
        "timestamp": {"0": "22:00:06", "1": "17:24:46", "2": "NULL"},
        "month": {"0": "09", "1": "02", "2": "NULL"},
        "year": {"0": "2012", "1": "1997", "2": "NULL"},
        "day": {"0": "19", "1": "10", "2": "NULL"},
        "time_period": {"0": "Evening", "1": "Late_Hours", "2": "NULL"},
        "date_uuid": {"0": "3b7ca996", "1": "adc86836", "2": "NULL"}
    }"#;
    Ok(parse_json("date_details.json", json)?)
}

fn raw_orders() -> Result<Table> {
    Ok(Table::from_columns(
        "orders_table",
        vec![
            Column::new("level_0", vec![Cell::Int(0), Cell::Int(1)]),
            Column::new("index", vec![Cell::Int(10), Cell::Int(11)]),
            text_column("first_name", &[Some("Ada"), None]),
            text_column("product_code", &[Some("R7-3126933h"), Some("C3-7044049C")]),
            Column::new("product_quantity", vec![Cell::Int(3), Cell::Int(1)]),
        ],
    )?)
}

#[test]
fn test_users_pipeline_end_to_end() -> Result<()> {
    let (cleaned, report) = plan::users().clean(legacy_users())?;

    assert_eq!(
        cleaned.column("country_code").unwrap().cells,
        vec![Cell::text("GB"), Cell::text("GB"), Cell::text("US"), Cell::text("DE")]
    );
    assert_eq!(cleaned.index(), &[0, 1, 2, 3]);
    assert!(cleaned.column("index").is_none());
    assert_eq!(report.rows_in, 6);
    assert_eq!(report.rows_out, 4);

    let join = &cleaned.column("join_date").unwrap().cells;
    assert_eq!(join[0], Cell::Date(NaiveDate::from_ymd_opt(2001, 5, 3).unwrap()));
    assert_eq!(join[1], Cell::Missing);
    assert_eq!(join[3], Cell::Date(NaiveDate::from_ymd_opt(1991, 6, 28).unwrap()));
    Ok(())
}

#[test]
fn test_cards_pipeline() -> Result<()> {
    let (cleaned, report) = plan::cards().clean(raw_cards()?)?;
    assert_eq!(report.rows_out, 2);
    assert_eq!(
        cleaned.column("expiry_date").unwrap().cells,
        vec![Cell::text("09/2026"), Cell::Missing]
    );
    assert_eq!(
        cleaned.column("date_payment_confirmed").unwrap().cells[1],
        Cell::Date(NaiveDate::from_ymd_opt(2001, 10, 18).unwrap())
    );
    Ok(())
}

#[test]
fn test_stores_pipeline_from_api_records() -> Result<()> {
    let (cleaned, report) = plan::stores().clean(raw_stores()?)?;
    assert_eq!(cleaned.index(), &[0, 1]);
    assert!(cleaned.column("lat").is_none());
    assert!(cleaned.column("index").is_none());
    assert_eq!(
        cleaned.column("continent").unwrap().cells,
        vec![Cell::text("Europe"), Cell::text("Europe")]
    );
    assert_eq!(cleaned.column("staff_numbers").unwrap().cells, vec![Cell::Int(78), Cell::Int(34)]);
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].row_index, 3);
    Ok(())
}

#[test]
fn test_products_pipeline_from_csv() -> Result<()> {
    let (cleaned, report) = plan::products().clean(raw_products()?)?;
    assert_eq!(cleaned.index(), &[1, 2, 4]);
    assert_eq!(
        cleaned.column("weight").unwrap().cells,
        vec![Cell::Float(1.6), Cell::Float(1.2), Cell::Float(0.25)]
    );
    assert_eq!(
        cleaned.column("date_added").unwrap().cells[2],
        Cell::Date(NaiveDate::from_ymd_opt(2018, 10, 21).unwrap())
    );
    assert_eq!(report.issues.len(), 1);
    assert!(report.issues[0].reason.contains("77"));
    Ok(())
}

#[test]
fn test_date_events_pipeline_from_json() -> Result<()> {
    let (cleaned, _) = plan::date_events().clean(raw_date_events()?)?;
    assert_eq!(cleaned.num_rows(), 2);
    assert_eq!(cleaned.column("month").unwrap().cells, vec![Cell::Int(9), Cell::Int(2)]);
    assert_eq!(cleaned.column("year").unwrap().cells, vec![Cell::Int(2012), Cell::Int(1997)]);
    assert_eq!(cleaned.column("day").unwrap().cells, vec![Cell::Int(19), Cell::Int(10)]);
    assert_eq!(
        cleaned.column("timestamp").unwrap().cells[0],
        Cell::Time(chrono::NaiveTime::from_hms_opt(22, 0, 6).unwrap())
    );
    Ok(())
}

#[test]
fn test_orders_pipeline_drops_personal_columns() -> Result<()> {
    let (cleaned, _) = plan::orders().clean(raw_orders()?)?;
    assert_eq!(cleaned.column_names(), vec!["product_code", "product_quantity"]);
    assert_eq!(cleaned.index(), &[10, 11]);
    Ok(())
}

/// Cleaning never adds rows, for every built-in plan fed a table it accepts.
#[test]
fn test_row_count_never_grows() -> Result<()> {
    let plans = default_plans();
    assert_eq!(plans.len(), 6);
    for plan in plans {
        let raw = match plan.name.as_str() {
            "users" => legacy_users(),
            "cards" => raw_cards()?,
            "stores" => raw_stores()?,
            "products" => raw_products()?,
            "orders" => raw_orders()?,
            "date_events" => raw_date_events()?,
            other => panic!("no fixture for plan '{}'", other),
        };
        let rows_in = raw.num_rows();
        let (cleaned, report) = plan.clean(raw)?;
        assert!(cleaned.num_rows() <= rows_in, "{} grew", plan.name);
        assert_eq!(report.rows_in, rows_in);
        assert_eq!(report.rows_in - report.rows_dropped(), report.rows_out, "{}", plan.name);
    }
    Ok(())
}

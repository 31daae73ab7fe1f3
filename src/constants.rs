/// Table plan names, used on the command line and as config keys.
pub const USERS: &str = "users";
pub const CARDS: &str = "cards";
pub const STORES: &str = "stores";
pub const PRODUCTS: &str = "products";
pub const DATE_EVENTS: &str = "date_events";
pub const ORDERS: &str = "orders";

/// Run order when no tables are named.
pub const RUN_ORDER: &[&str] = &[USERS, CARDS, STORES, PRODUCTS, DATE_EVENTS, ORDERS];

// Source references
pub const LEGACY_USERS_TABLE: &str = "legacy_users";
pub const ORDERS_SOURCE_TABLE: &str = "orders_table";
pub const CARD_DETAILS_PDF: &str =
    "https://data-handling-public.s3.eu-west-1.amazonaws.com/card_details.pdf";
pub const PRODUCTS_OBJECT: &str = "s3://data-handling-public/products.csv";
pub const DATE_DETAILS_OBJECT: &str =
    "https://data-handling-public.s3.eu-west-1.amazonaws.com/date_details.json";

// Store directory API
pub const STORE_COUNT_URL: &str =
    "https://aqj7u5id95.execute-api.eu-west-1.amazonaws.com/prod/number_stores";
pub const STORE_DETAIL_URL: &str =
    "https://aqj7u5id95.execute-api.eu-west-1.amazonaws.com/prod/store_details/{store_number}";
pub const STORE_API_KEY_ENV: &str = "RETAIL_ETL_STORE_API_KEY";

/// Template for turning `s3://bucket/key` into a public HTTPS URL.
pub const S3_ENDPOINT_TEMPLATE: &str = "https://{bucket}.s3.eu-west-1.amazonaws.com/{key}";

pub const PUSHGATEWAY_URL_ENV: &str = "RETAIL_ETL_PUSHGATEWAY_URL";

// Permitted category sets
pub const COUNTRY_CODES: &[&str] = &["GB", "US", "DE"];

pub const CARD_PROVIDERS: &[&str] = &[
    "Diners Club / Carte Blanche",
    "Mastercard",
    "VISA 13 digit",
    "VISA 16 digit",
    "Discover",
    "American Express",
    "Maestro",
    "JCB 16 digit",
    "VISA 19 digit",
    "JCB 15 digit",
];

pub const PRODUCT_CATEGORIES: &[&str] = &[
    "toys-and-games",
    "sports-and-leisure",
    "pets",
    "homeware",
    "health-and-beauty",
    "food-and-drink",
    "diy",
];

pub const TIME_PERIODS: &[&str] = &["Evening", "Midday", "Morning", "Late_Hours"];

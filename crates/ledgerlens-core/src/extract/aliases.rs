/// Receipt fields the extractor knows how to populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    Date,
    Cost,
    Currency,
    Vendor,
    Location,
    Type,
    Description,
    PaymentMethod,
    Items,
}

/// Key aliases per field. Within a row the first key holding a non-null value wins.
///
/// `cost` is listed ahead of `total`; keep that order.
pub(crate) const FIELD_ALIASES: &[(Field, &[&str])] = &[
    (
        Field::Date,
        &["date", "Date", "transactionDate", "TransactionDate", "receiptDate"],
    ),
    (
        Field::Cost,
        &[
            "cost",
            "Cost",
            "total",
            "Total",
            "totalAmount",
            "TotalAmount",
            "amount",
            "Amount",
        ],
    ),
    (Field::Currency, &["currency", "Currency", "currencyCode"]),
    (
        Field::Vendor,
        &["vendor", "Vendor", "merchant", "Merchant", "store", "Store", "storeName"],
    ),
    (
        Field::Location,
        &["location", "Location", "address", "Address", "city", "City"],
    ),
    (
        Field::Type,
        &["type", "Type", "category", "Category", "expenseType"],
    ),
    (
        Field::Description,
        &["description", "Description", "summary", "notes"],
    ),
    (
        Field::PaymentMethod,
        &["paymentMethod", "PaymentMethod", "payment_method", "payment"],
    ),
    (Field::Items, &["items", "Items", "lineItems", "line_items"]),
];

/// Keys read from a single line item object.
pub(crate) const ITEM_NAME_KEYS: &[&str] = &["name", "Name", "description", "item"];
pub(crate) const ITEM_PRICE_KEYS: &[&str] = &["price", "Price", "amount", "total", "cost"];

/// Keys an odometer answer may carry its reading under.
pub(crate) const ODOMETER_ALIASES: &[&str] = &["reading", "odometer", "value", "number", "text"];

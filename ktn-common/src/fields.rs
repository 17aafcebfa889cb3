//! Declared order-field dictionary
//!
//! Every column an operator may put into an order sheet is listed here once,
//! paired with the header text used in the spreadsheet and the column name
//! used in the `orders` table. Sheets map their header row onto this table
//! at runtime; headers that are not listed are reported by the field-name
//! check instead of being silently dropped.

use std::fmt;

/// Header of the column holding the customer link
pub const LINK_HEADER: &str = "Ссылка";

/// Header of the order sum column
pub const SUM_HEADER: &str = "Сумма";

/// Header cells the field-name check never reports
pub const EXCLUDED_HEADERS: &[&str] = &["да"];

/// Storage type of a declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
}

/// A declared order field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OrderField {
    Payment,
    PickupPoint,
    Email,
    Inscription,
    Details,
    Texture,
    Pendant,
    Ring,
    ForNotes,
    Socials,
    FullName,
    InscriptionBracelet,
    Description,
    PostCode,
    CustomerLink,
    TimeTo,
    EdgeLower,
    DeliveryCost,
    Phone,
    Earrings,
    City,
    TimeFrom,
    DeliveryType,
    Notes,
    BoxberryNumber,
    EdgeUpper,
    Type,
    Extras,
    DeliveryAddress,
    ForConfirmation,
    Symbol,
    Subtype,
    Sum,
    PickupNumber,
}

impl OrderField {
    /// All declared fields in storage column order
    pub const ALL: [OrderField; 34] = [
        OrderField::Payment,
        OrderField::PickupPoint,
        OrderField::Email,
        OrderField::Inscription,
        OrderField::Details,
        OrderField::Texture,
        OrderField::Pendant,
        OrderField::Ring,
        OrderField::ForNotes,
        OrderField::Socials,
        OrderField::FullName,
        OrderField::InscriptionBracelet,
        OrderField::Description,
        OrderField::PostCode,
        OrderField::CustomerLink,
        OrderField::TimeTo,
        OrderField::EdgeLower,
        OrderField::DeliveryCost,
        OrderField::Phone,
        OrderField::Earrings,
        OrderField::City,
        OrderField::TimeFrom,
        OrderField::DeliveryType,
        OrderField::Notes,
        OrderField::BoxberryNumber,
        OrderField::EdgeUpper,
        OrderField::Type,
        OrderField::Extras,
        OrderField::DeliveryAddress,
        OrderField::ForConfirmation,
        OrderField::Symbol,
        OrderField::Subtype,
        OrderField::Sum,
        OrderField::PickupNumber,
    ];

    /// Inscription-bearing fields, in the order they are joined into `search`
    pub const INSCRIPTIONS: [OrderField; 5] = [
        OrderField::Inscription,
        OrderField::InscriptionBracelet,
        OrderField::EdgeLower,
        OrderField::EdgeUpper,
        OrderField::Symbol,
    ];

    /// Header text used in the source spreadsheet
    pub fn header(self) -> &'static str {
        match self {
            OrderField::Payment => "Оплата",
            OrderField::PickupPoint => "Код ПВЗ",
            OrderField::Email => "e-mail",
            OrderField::Inscription => "Надпись",
            OrderField::Details => "Характеристики",
            OrderField::Texture => "Фактура",
            OrderField::Pendant => "Подвеска",
            OrderField::Ring => "Кольцо",
            OrderField::ForNotes => "Для заметок",
            OrderField::Socials => "Соцсеть",
            OrderField::FullName => "ФИО",
            OrderField::InscriptionBracelet => "Браслет надпись",
            OrderField::Description => "Описание",
            OrderField::PostCode => "Индекс",
            OrderField::CustomerLink => LINK_HEADER,
            OrderField::TimeTo => "...время до",
            OrderField::EdgeLower => "Нижний торец",
            OrderField::DeliveryCost => "Цена доставки",
            OrderField::Phone => "Телефон",
            OrderField::Earrings => "Серьги",
            OrderField::City => "Город",
            OrderField::TimeFrom => "Время с...",
            OrderField::DeliveryType => "Способ доставки",
            OrderField::Notes => "Заметки",
            OrderField::BoxberryNumber => "Номер заказа (Boxberry)",
            OrderField::EdgeUpper => "Верхний торец",
            OrderField::Type => "Тип",
            OrderField::Extras => "Дополнительно",
            OrderField::DeliveryAddress => "Адрес доставки",
            OrderField::ForConfirmation => "Для подтверждения",
            OrderField::Symbol => "Символ",
            OrderField::Subtype => "Вид",
            OrderField::Sum => SUM_HEADER,
            OrderField::PickupNumber => "Номер самовывоза",
        }
    }

    /// Column name in the `orders` table
    pub fn column(self) -> &'static str {
        match self {
            OrderField::Payment => "payment",
            OrderField::PickupPoint => "pickup_point",
            OrderField::Email => "email",
            OrderField::Inscription => "inscription",
            OrderField::Details => "details",
            OrderField::Texture => "texture",
            OrderField::Pendant => "pendant",
            OrderField::Ring => "ring",
            OrderField::ForNotes => "for_notes",
            OrderField::Socials => "socials",
            OrderField::FullName => "full_name",
            OrderField::InscriptionBracelet => "inscription_bracelet",
            OrderField::Description => "description",
            OrderField::PostCode => "post_code",
            OrderField::CustomerLink => "customer_link",
            OrderField::TimeTo => "time_to",
            OrderField::EdgeLower => "edge_lower",
            OrderField::DeliveryCost => "delivery_cost",
            OrderField::Phone => "phone",
            OrderField::Earrings => "earrings",
            OrderField::City => "city",
            OrderField::TimeFrom => "time_from",
            OrderField::DeliveryType => "delivery_type",
            OrderField::Notes => "notes",
            OrderField::BoxberryNumber => "boxberry_number",
            OrderField::EdgeUpper => "edge_upper",
            OrderField::Type => "type",
            OrderField::Extras => "extras",
            OrderField::DeliveryAddress => "delivery_address",
            OrderField::ForConfirmation => "for_confirmation",
            OrderField::Symbol => "symbol",
            OrderField::Subtype => "subtype",
            OrderField::Sum => "sum",
            OrderField::PickupNumber => "pickup_number",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            OrderField::Sum => FieldKind::Integer,
            _ => FieldKind::Text,
        }
    }

    /// Whether the field contributes to `search` and essentials
    pub fn is_inscription(self) -> bool {
        Self::INSCRIPTIONS.contains(&self)
    }

    /// Look up the declared field for a spreadsheet header
    pub fn from_header(header: &str) -> Option<OrderField> {
        Self::ALL.iter().copied().find(|f| f.header() == header)
    }
}

impl fmt::Display for OrderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

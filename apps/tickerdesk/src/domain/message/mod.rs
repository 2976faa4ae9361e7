//! Bus Messages
//!
//! The JSON payloads clients exchange over the broadcast bus. The schema
//! is tagged by a `type` field; unrecognized types decode to
//! [`BusMessage::Unknown`] so newer peers never break older ones.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::identity::{ClientId, Identity};
use crate::domain::register::PricePoint;
use crate::domain::symbol::Symbol;
use crate::domain::watchlist::Watchlist;

/// One broadcast payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BusMessage {
    /// An identity's ledger was replaced with a new full value.
    #[serde(rename = "subscriptions_updated")]
    SubscriptionsUpdated {
        /// The identity whose ledger changed.
        identity: Identity,
        /// The complete new ledger, in order.
        subscriptions: Vec<Symbol>,
    },

    /// A simulation driver produced a fresh price observation.
    #[serde(rename = "price_broadcast")]
    PriceBroadcast {
        /// The symbol the price belongs to.
        symbol: Symbol,
        /// The observed price, carried as a JSON number.
        #[serde(with = "rust_decimal::serde::float")]
        price: Decimal,
        /// When the originating client observed the price.
        #[serde(rename = "observedAt")]
        observed_at: DateTime<Utc>,
        /// The client that produced the observation.
        #[serde(rename = "originClientId")]
        origin_client_id: ClientId,
    },

    /// A message type this build does not know. Ignored on receipt.
    #[serde(other)]
    Unknown,
}

impl BusMessage {
    /// Announce a ledger replacement.
    #[must_use]
    pub fn subscriptions_updated(identity: &Identity, ledger: &Watchlist) -> Self {
        Self::SubscriptionsUpdated {
            identity: identity.clone(),
            subscriptions: ledger.symbols().to_vec(),
        }
    }

    /// Announce one price observation.
    #[must_use]
    pub fn price_broadcast(point: &PricePoint) -> Self {
        Self::PriceBroadcast {
            symbol: point.symbol.clone(),
            price: point.price,
            observed_at: point.observed_at,
            origin_client_id: point.origin.clone(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use rust_decimal::dec;
    use serde_json::json;

    use super::*;

    #[test]
    fn subscriptions_updated_wire_shape() {
        let identity = Identity::new("u@x.com");
        let mut ledger = Watchlist::new();
        ledger.toggle(Symbol::new("GOOG"));
        ledger.toggle(Symbol::new("NVDA"));

        let value =
            serde_json::to_value(BusMessage::subscriptions_updated(&identity, &ledger)).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "subscriptions_updated",
                "identity": "u@x.com",
                "subscriptions": ["GOOG", "NVDA"],
            })
        );
    }

    #[test]
    fn price_broadcast_wire_shape() {
        let point = PricePoint {
            symbol: Symbol::new("TSLA"),
            price: dec!(260.42),
            observed_at: DateTime::UNIX_EPOCH + TimeDelta::seconds(1),
            origin: ClientId::new("client-a"),
        };

        let value = serde_json::to_value(BusMessage::price_broadcast(&point)).unwrap();
        assert_eq!(value["type"], "price_broadcast");
        assert_eq!(value["symbol"], "TSLA");
        assert_eq!(value["price"], json!(260.42));
        assert_eq!(value["observedAt"], "1970-01-01T00:00:01Z");
        assert_eq!(value["originClientId"], "client-a");
    }

    #[test]
    fn price_broadcast_round_trips_through_json_text() {
        let point = PricePoint {
            symbol: Symbol::new("AMZN"),
            price: dec!(101.25),
            observed_at: DateTime::UNIX_EPOCH + TimeDelta::milliseconds(1_500),
            origin: ClientId::new("client-b"),
        };
        let message = BusMessage::price_broadcast(&point);

        let text = serde_json::to_string(&message).unwrap();
        let decoded: BusMessage = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn integer_price_decodes() {
        let decoded: BusMessage = serde_json::from_str(
            r#"{"type":"price_broadcast","symbol":"GOOG","price":135,"observedAt":"1970-01-01T00:00:01Z","originClientId":"client-a"}"#,
        )
        .unwrap();
        let BusMessage::PriceBroadcast { price, .. } = decoded else {
            panic!("expected a price broadcast");
        };
        assert_eq!(price, dec!(135));
    }

    #[test]
    fn unrecognized_type_decodes_to_unknown() {
        let decoded: BusMessage =
            serde_json::from_str(r#"{"type":"presence_ping","clientId":"client-z"}"#).unwrap();
        assert_eq!(decoded, BusMessage::Unknown);
    }

    #[test]
    fn missing_type_is_an_error() {
        assert!(serde_json::from_str::<BusMessage>(r#"{"symbol":"GOOG"}"#).is_err());
    }
}

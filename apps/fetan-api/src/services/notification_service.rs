use fetan_db::models::order::{Order, status};
use serde_json::json;

/// Pushes order updates to customers over the Telegram Bot API.
/// Fire-and-forget: a delivery failure is logged and never fails the
/// request that triggered it. Disabled when no bot token is configured.
#[derive(Clone)]
pub struct NotificationService {
    client: reqwest::Client,
    bot_token: Option<String>,
}

impl NotificationService {
    pub fn new(bot_token: Option<String>) -> Self {
        if bot_token.is_none() {
            tracing::warn!("BOT_TOKEN not set, Telegram notifications disabled");
        }
        // Sends run inline with request handling; a hung Telegram API
        // must not stall the customer's response.
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { client, bot_token }
    }

    pub async fn order_created(&self, tg_id: i64, order: &Order) {
        let text = format!(
            "🧾 Order {} received!\nTotal: {}\nWe will confirm it once your payment is verified.",
            order.order_number,
            format_cents(order.total)
        );
        self.send(tg_id, &text).await;
    }

    pub async fn order_status_changed(&self, tg_id: i64, order: &Order) {
        let text = match order.status.as_str() {
            status::CONFIRMED => format!(
                "✅ Order {} confirmed! We are preparing it now.",
                order.order_number
            ),
            status::PROCESSING => format!("📦 Order {} is being packed.", order.order_number),
            status::SHIPPED => match order.tracking_number.as_deref() {
                Some(tracking) => format!(
                    "🚚 Order {} shipped! Tracking: {tracking}",
                    order.order_number
                ),
                None => format!("🚚 Order {} shipped!", order.order_number),
            },
            status::DELIVERED => format!(
                "🎉 Order {} delivered. Thank you for shopping with us!",
                order.order_number
            ),
            status::CANCELLED => format!("❌ Order {} was cancelled.", order.order_number),
            _ => return,
        };
        self.send(tg_id, &text).await;
    }

    async fn send(&self, tg_id: i64, text: &str) {
        let Some(token) = &self.bot_token else {
            return;
        };
        let url = format!("https://api.telegram.org/bot{token}/sendMessage");
        let result = self
            .client
            .post(&url)
            .json(&json!({ "chat_id": tg_id, "text": text }))
            .send()
            .await;
        match result {
            Ok(resp) if resp.status().is_success() => {}
            Ok(resp) => {
                tracing::warn!("Telegram sendMessage to {tg_id} returned {}", resp.status());
            }
            Err(e) => {
                tracing::warn!("Telegram sendMessage to {tg_id} failed: {e}");
            }
        }
    }
}

fn format_cents(amount: i64) -> String {
    format!("{}.{:02} ETB", amount / 100, amount % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cents_render_with_two_decimals() {
        assert_eq!(format_cents(12345), "123.45 ETB");
        assert_eq!(format_cents(500), "5.00 ETB");
        assert_eq!(format_cents(7), "0.07 ETB");
    }
}

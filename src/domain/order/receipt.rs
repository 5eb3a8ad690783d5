//! Purchase receipt: queued when an order is paid, rendered and sent by the work queue.

use std::fmt::Write;

use anyhow::Context;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::warn;

use crate::{
    domain::OrderId,
    providers::{Mailer, OutgoingEmail},
    subsystems::work_queue::{TaskArgs, TaskDomainArgs, TaskLimit, TaskTrigger},
};

use super::view_order::{OrderDetails, order_details};

//------------ Task for triggering Processor -----------

/// One receipt per order, however often payment confirmation is attempted.
pub(super) fn receipt_task(order_id: OrderId) -> TaskArgs {
    TaskArgs {
        trigger: TaskTrigger::Once(format!("receipt-{order_id}")),
        limits: TaskLimit::MaxAttempts(5),
        domain_args: TaskDomainArgs::SendPurchaseReceipt(ReceiptArgs { order_id }),
    }
}

//---------------------- Processor  -----------------------

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ReceiptArgs {
    pub order_id: OrderId,
}

pub async fn send_purchase_receipt(
    pool: &PgPool,
    mailer: &Mailer,
    base_url: &str,
    args: ReceiptArgs,
) -> Result<(), anyhow::Error> {
    let order_id = args.order_id;
    let mut conn = pool.acquire().await.context("Problem acquiring connection.")?;
    let Some(details) = order_details(&mut conn, order_id).await? else {
        warn!("Order {order_id} was deleted before its receipt was sent");
        return Ok(());
    };

    let email = OutgoingEmail {
        to: details.user.email.clone(),
        subject: format!("Order Confirmation {order_id}"),
        html: render_receipt(&details, mailer.app_name(), base_url),
    };
    mailer.send(email).await
}

pub fn render_receipt(details: &OrderDetails, app_name: &str, base_url: &str) -> String {
    let order = &details.order;
    let mut html = String::new();

    let _ = write!(
        html,
        "<html><head><title>{app_name} purchase receipt</title></head>\
         <body style=\"font-family: sans-serif\"><div style=\"max-width: 36rem\">\
         <h1>Purchase Receipt</h1>\
         <table width=\"100%\"><tr>\
         <td><p>Order ID</p><p>{order_id}</p></td>\
         <td align=\"right\"><p>Purchase Date</p><p>{purchased}</p></td>\
         </tr></table>\
         <table width=\"100%\" style=\"border: 1px solid #6b7280; padding: 1rem\">",
        app_name = escape_html(app_name),
        order_id = order.order_id,
        purchased = order.created_at.strftime("%b %d, %Y %H:%M UTC"),
    );

    for item in &order.items {
        let _ = write!(
            html,
            "<tr><td width=\"80\"><img width=\"80\" alt=\"{name}\" src=\"{src}\"/></td>\
             <td>{name} x {quantity}</td><td align=\"right\">{price}</td></tr>",
            name = escape_html(&item.name),
            src = escape_html(&image_url(&item.image, base_url)),
            quantity = item.quantity,
            price = format_currency(item.price),
        );
    }

    for (label, amount) in [
        ("Items", order.prices.items_price),
        ("Tax", order.prices.tax_price),
        ("Shipping", order.prices.shipping_price),
        ("Total", order.prices.total_price),
    ] {
        let _ = write!(
            html,
            "<tr><td colspan=\"2\" align=\"right\">{label}: </td>\
             <td align=\"right\">{}</td></tr>",
            format_currency(amount)
        );
    }

    html.push_str("</table></div></body></html>");
    html
}

/// Images stored by the storefront itself are served relative to its public URL.
fn image_url(image: &str, base_url: &str) -> String {
    if image.starts_with('/') {
        format!("{}{image}", base_url.trim_end_matches('/'))
    } else {
        image.to_owned()
    }
}

fn format_currency(amount: Decimal) -> String {
    format!("${:.2}", amount)
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

//-------------------------- Tests -------------------------------

mod admin_orders;
mod confirm_payment;
mod errors;
mod model;
mod paypal_payment;
mod place_order;
mod receipt;
mod stripe_payment;
mod summary;
mod view_order;

pub use admin_orders::{
    admin_orders_endpoint, all_orders, delete_order, delete_order_endpoint, deliver_order,
    deliver_order_endpoint,
};
pub use confirm_payment::{confirm_payment, mark_paid_endpoint};
pub use errors::OrderError;
pub use model::{
    Order, OrderItem, PaymentResult, find_order, insert_order, save_order_status,
};
pub use paypal_payment::{
    ApprovePayPalPayload, approve_paypal_order, approve_paypal_order_endpoint,
    create_paypal_order, create_paypal_order_endpoint, verify_capture,
};
pub use place_order::{Checkout, CheckoutStep, place_order, place_order_endpoint, plan_checkout};
pub use receipt::{ReceiptArgs, render_receipt, send_purchase_receipt};
pub use stripe_payment::{
    SIGNATURE_HEADER, StripeEvent, WebhookReceived, charge_payment, create_payment_intent,
    create_payment_intent_endpoint, handle_stripe_event, stripe_webhook_endpoint,
};
pub use summary::{MonthlySales, OrdersSummary, orders_summary, orders_summary_endpoint};
pub use view_order::{
    Buyer, OrderDetails, OrderOverview, my_orders, my_orders_endpoint, order_by_id,
    order_details, order_endpoint, payable_order,
};

mod health_check;
mod checkout;
mod stripe_webhook;
mod test_utils;

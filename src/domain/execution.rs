//! Order execution against a simulated account.
//!
//! Fees follow the exchange assumptions: a flat fee plus a percentage of the
//! traded value. Purchases pay the fee from currency, sales pay it out of
//! the proceeds.

use super::account::{Account, ExchangeAssumptions, Transaction};
use super::context::StrategyErrorKind;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Order {
    /// Spend the whole currency balance.
    PurchaseMax,
    /// Sell every held asset.
    SellMax,
    /// Buy a fixed number of asset units.
    Purchase(f64),
    /// Sell a fixed number of asset units.
    Sell(f64),
}

/// Calculate commission: flat_fee + (trade_value * pct / 100).
pub fn calculate_commission(trade_value: f64, exchange: &ExchangeAssumptions) -> f64 {
    exchange.transaction_fee + (trade_value * exchange.transaction_fee_percentage / 100.0)
}

/// Whether enough time has passed since `last` to trade again at `time`.
pub fn time_gate_open(time: f64, last: Option<f64>, exchange: &ExchangeAssumptions) -> bool {
    match last {
        Some(last) => time - last >= exchange.transaction_time_s,
        None => true,
    }
}

/// Execute `order` at `price` and `time`, returning the transaction to apply.
///
/// Checks run in order:
/// 1. The price must be positive and finite
/// 2. `transaction_time_s` must have elapsed since `last_transaction_time`
/// 3. The account must be able to afford the order
///
/// The account is not modified; callers apply the returned transaction.
pub fn execute(
    order: Order,
    account: &Account,
    price: f64,
    time: f64,
    last_transaction_time: Option<f64>,
    exchange: &ExchangeAssumptions,
) -> Result<Transaction, StrategyErrorKind> {
    if !(price.is_finite() && price > 0.0) {
        return Err(StrategyErrorKind::InvalidPrice);
    }
    if !time_gate_open(time, last_transaction_time, exchange) {
        return Err(StrategyErrorKind::NotEnoughTimeSinceLastTransaction);
    }

    let (fee, currency_transferred, asset_transferred) = match order {
        Order::PurchaseMax => {
            let cost = (account.currency_balance - exchange.transaction_fee)
                / (1.0 + exchange.transaction_fee_percentage / 100.0);
            let amount = cost / price;
            if !(amount > 0.0) {
                return Err(StrategyErrorKind::NotEnoughMoneyToMakePurchase);
            }
            let fee = calculate_commission(cost, exchange);
            (fee, -cost - fee, amount)
        }
        Order::Purchase(amount) => {
            let cost = amount * price;
            let fee = calculate_commission(cost, exchange);
            if !(amount > 0.0) || cost + fee > account.currency_balance {
                return Err(StrategyErrorKind::NotEnoughMoneyToMakePurchase);
            }
            (fee, -cost - fee, amount)
        }
        Order::SellMax => sale(account.asset_balance, account, price, exchange)?,
        Order::Sell(amount) => sale(amount, account, price, exchange)?,
    };

    Ok(Transaction {
        time,
        fee,
        currency_transferred,
        asset_transferred,
        account: account.name.clone(),
    })
}

/// Sell `amount` units; the fee is paid in asset terms, so the net amount
/// converted to currency is `amount - fee / price`.
fn sale(
    amount: f64,
    account: &Account,
    price: f64,
    exchange: &ExchangeAssumptions,
) -> Result<(f64, f64, f64), StrategyErrorKind> {
    if !(amount > 0.0) || amount > account.asset_balance {
        return Err(StrategyErrorKind::NotEnoughAssetsToMakePurchase);
    }
    let fee = calculate_commission(amount * price, exchange);
    let net_amount = amount - fee / price;
    if net_amount <= 0.0 {
        return Err(StrategyErrorKind::NoAssetsToCoverTransactionFee);
    }
    Ok((fee, net_amount * price, -amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(fee: f64, pct: f64, time: f64) -> ExchangeAssumptions {
        ExchangeAssumptions {
            transaction_fee: fee,
            transaction_fee_percentage: pct,
            transaction_time_s: time,
        }
    }

    #[test]
    fn commission() {
        let ex = exchange(1.0, 0.5, 0.0);
        assert!((calculate_commission(1000.0, &ex) - 6.0).abs() < f64::EPSILON);
        assert!((calculate_commission(0.0, &ex) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn purchase_max_flat_fee() {
        let mut account = Account::new(100.0, 0.0);
        let tx = execute(Order::PurchaseMax, &account, 10.0, 0.0, None, &exchange(1.0, 0.0, 0.0)).unwrap();
        tx.apply(&mut account);
        assert!((tx.asset_transferred - 9.9).abs() < 1e-12);
        assert!((tx.fee - 1.0).abs() < f64::EPSILON);
        assert!(account.currency_balance.abs() < 1e-12);
        assert!((account.asset_balance - 9.9).abs() < 1e-12);
    }

    #[test]
    fn purchase_max_percentage_fee_spends_balance() {
        let mut account = Account::new(1010.0, 0.0);
        let tx = execute(Order::PurchaseMax, &account, 10.0, 0.0, None, &exchange(0.0, 1.0, 0.0)).unwrap();
        tx.apply(&mut account);
        assert!((tx.asset_transferred - 100.0).abs() < 1e-9);
        assert!((tx.fee - 10.0).abs() < 1e-9);
        assert!(account.currency_balance.abs() < 1e-9);
    }

    #[test]
    fn purchase_max_without_money() {
        let account = Account::new(1.0, 0.0);
        assert_eq!(
            execute(Order::PurchaseMax, &account, 10.0, 0.0, None, &exchange(1.0, 0.0, 0.0)),
            Err(StrategyErrorKind::NotEnoughMoneyToMakePurchase)
        );
    }

    #[test]
    fn purchase_fixed_amount() {
        let account = Account::new(100.0, 0.0);
        let tx = execute(Order::Purchase(5.0), &account, 10.0, 0.0, None, &exchange(1.0, 0.0, 0.0)).unwrap();
        assert!((tx.currency_transferred + 51.0).abs() < f64::EPSILON);
        assert!((tx.asset_transferred - 5.0).abs() < f64::EPSILON);
        assert_eq!(
            execute(Order::Purchase(10.0), &account, 10.0, 0.0, None, &exchange(1.0, 0.0, 0.0)),
            Err(StrategyErrorKind::NotEnoughMoneyToMakePurchase)
        );
    }

    #[test]
    fn sell_max_pays_fee_from_assets() {
        let mut account = Account::new(0.0, 9.9);
        let tx = execute(Order::SellMax, &account, 10.0, 0.0, None, &exchange(1.0, 0.0, 0.0)).unwrap();
        tx.apply(&mut account);
        assert!((account.currency_balance - 98.0).abs() < 1e-9);
        assert!(account.asset_balance.abs() < f64::EPSILON);
    }

    #[test]
    fn sell_errors() {
        let ex = exchange(1.0, 0.0, 0.0);
        assert_eq!(
            execute(Order::SellMax, &Account::new(100.0, 0.0), 10.0, 0.0, None, &ex),
            Err(StrategyErrorKind::NotEnoughAssetsToMakePurchase)
        );
        assert_eq!(
            execute(Order::SellMax, &Account::new(0.0, 0.05), 10.0, 0.0, None, &ex),
            Err(StrategyErrorKind::NoAssetsToCoverTransactionFee)
        );
        assert_eq!(
            execute(Order::Sell(2.0), &Account::new(0.0, 1.0), 10.0, 0.0, None, &ex),
            Err(StrategyErrorKind::NotEnoughAssetsToMakePurchase)
        );
    }

    #[test]
    fn invalid_price() {
        let account = Account::new(100.0, 1.0);
        let ex = exchange(0.0, 0.0, 0.0);
        for price in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert_eq!(
                execute(Order::PurchaseMax, &account, price, 0.0, None, &ex),
                Err(StrategyErrorKind::InvalidPrice)
            );
        }
    }

    #[test]
    fn time_gate() {
        let ex = exchange(0.0, 0.0, 60.0);
        let account = Account::new(100.0, 0.0);
        assert_eq!(
            execute(Order::PurchaseMax, &account, 10.0, 30.0, Some(0.0), &ex),
            Err(StrategyErrorKind::NotEnoughTimeSinceLastTransaction)
        );
        assert!(execute(Order::PurchaseMax, &account, 10.0, 60.0, Some(0.0), &ex).is_ok());
        assert!(time_gate_open(0.0, None, &ex));
    }

    #[test]
    fn time_gate_reported_before_funds() {
        let ex = exchange(1.0, 0.0, 60.0);
        assert_eq!(
            execute(Order::PurchaseMax, &Account::new(0.0, 9.9), 10.0, 30.0, Some(0.0), &ex),
            Err(StrategyErrorKind::NotEnoughTimeSinceLastTransaction)
        );
        assert_eq!(
            execute(Order::PurchaseMax, &Account::new(0.0, 9.9), 10.0, 60.0, Some(0.0), &ex),
            Err(StrategyErrorKind::NotEnoughMoneyToMakePurchase)
        );
    }
}

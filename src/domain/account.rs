//! Simulated account, transactions and exchange assumptions.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Account {
    #[serde(default = "default_account_name")]
    pub name: String,
    pub currency_balance: f64,
    pub asset_balance: f64,
}

fn default_account_name() -> String {
    "Main".to_string()
}

impl Account {
    pub fn new(currency_balance: f64, asset_balance: f64) -> Self {
        Account {
            name: default_account_name(),
            currency_balance,
            asset_balance,
        }
    }

    /// currency + assets valued at `price`
    pub fn mark_to_market(&self, price: f64) -> f64 {
        self.currency_balance + self.asset_balance * price
    }
}

/// A completed transfer. `currency_transferred` is negative for buys and
/// positive for sells; `asset_transferred` has the opposite sign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Transaction {
    pub time: f64,
    pub fee: f64,
    pub currency_transferred: f64,
    pub asset_transferred: f64,
    pub account: String,
}

impl Transaction {
    pub fn apply(&self, account: &mut Account) {
        account.currency_balance += self.currency_transferred;
        account.asset_balance += self.asset_transferred;
    }

    pub fn is_purchase(&self) -> bool {
        self.asset_transferred > 0.0
    }

    /// Currency paid or received per unit of asset, fees included.
    pub fn effective_price(&self) -> f64 {
        (self.currency_transferred / self.asset_transferred).abs()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ExchangeAssumptions {
    /// Flat fee per transaction, in currency.
    pub transaction_fee: f64,
    /// Fee as a percentage of the traded value.
    pub transaction_fee_percentage: f64,
    /// Minimum seconds between two transactions.
    pub transaction_time_s: f64,
}

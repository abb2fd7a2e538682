//! Deterministic sample backtest for demos and benchmarks.
//!
//! Daily random-walk bars starting 2021-01-01 and a long-only strategy that
//! alternates BUY and SELL every few bars. Balances and drawdowns are
//! consistent with the fills: entries leave the balance unchanged (pnl `-`),
//! exits realise the round trip.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rptr_core::domain::{Bar, Numeric, OrderEvent, OrderType, Timestamp};

const START: i64 = 1_609_459_200;
const DAY: i64 = 86_400;
const STARTING_BALANCE: f64 = 100_000.0;

/// Number of round trips targeted over the series.
const ROUND_TRIPS: usize = 10;

#[derive(Debug, Clone)]
pub struct SampleBacktest {
    pub bars: Vec<Bar>,
    pub orders: Vec<OrderEvent>,
    pub strategy: String,
}

pub fn generate(bar_count: usize, seed: u64) -> SampleBacktest {
    let mut rng = StdRng::seed_from_u64(seed);
    let bars = random_walk(&mut rng, bar_count);
    let orders = alternate_orders(&mut rng, &bars);
    SampleBacktest {
        bars,
        orders,
        strategy: sample_strategy(seed),
    }
}

fn random_walk(rng: &mut StdRng, bar_count: usize) -> Vec<Bar> {
    let mut price = 100.0_f64;
    (0..bar_count)
        .map(|i| {
            let ret: f64 = rng.gen_range(-0.03..0.03);
            let open = price;
            let close = price * (1.0 + ret);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
            price = close;
            Bar {
                time: Timestamp(START + i as i64 * DAY),
                open: round_to(open, 2),
                high: round_to(high, 2),
                low: round_to(low, 2),
                close: round_to(close, 2),
            }
        })
        .collect()
}

fn alternate_orders(rng: &mut StdRng, bars: &[Bar]) -> Vec<OrderEvent> {
    let spacing = (bars.len() / (ROUND_TRIPS * 2)).max(1);
    let mut balance = STARTING_BALANCE;
    let mut peak = balance;
    let mut entry: Option<(f64, f64)> = None;
    let mut orders = Vec::new();

    for bar in bars.iter().skip(1).step_by(spacing) {
        let price = bar.close;
        let event = match entry.take() {
            None => {
                let quantity = ((balance * rng.gen_range(0.5..0.9)) / price).floor().max(1.0);
                entry = Some((price, quantity));
                let mut e = OrderEvent::fill(bar.time, OrderType::Buy, price, quantity)
                    .with_snapshot(balance, drawdown(peak, balance))
                    .with_id("Long");
                e.position = quantity.into();
                e.pnl = Numeric::parse("-");
                e
            }
            Some((entry_price, quantity)) => {
                let pnl = round_to((price - entry_price) * quantity, 2);
                balance = round_to(balance + pnl, 2);
                peak = peak.max(balance);
                let mut e = OrderEvent::fill(bar.time, OrderType::Sell, price, quantity)
                    .with_snapshot(balance, drawdown(peak, balance))
                    .with_id("Exit Long");
                e.av_price = entry_price.into();
                e.pnl = pnl.into();
                e
            }
        };
        orders.push(event);
    }
    orders
}

fn drawdown(peak: f64, balance: f64) -> f64 {
    if peak <= 0.0 {
        return 0.0;
    }
    round_to((peak - balance) / peak * 100.0, 2)
}

fn round_to(v: f64, decimals: i32) -> f64 {
    let f = 10f64.powi(decimals);
    (v * f).round() / f
}

const STRATEGY_BODY: &str = r#"# enter long on close, exit on the next signal bar
def on_bar(ctx):
    if ctx.flat:
        ctx.buy(fraction=0.7)
    else:
        ctx.close()
"#;

fn sample_strategy(seed: u64) -> String {
    format!("# sample strategy (seed {seed})\n{STRATEGY_BODY}")
}

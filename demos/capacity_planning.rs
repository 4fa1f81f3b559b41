//! Filter capacity planning.
//!
//! Run with: cargo run --example capacity_planning

use pwnedbloom::core::params::{self, FilterPlan};

fn report(name: &str, plan: &FilterPlan) {
    println!("{name}");
    println!("  capacity:        {}", plan.capacity);
    println!("  error rate:      {}", plan.error_rate);
    println!("  hash functions:  {}", plan.hash_count);
    println!("  shards:          {}", plan.shard_count);
    println!("  bits per shard:  {}", plan.bits_per_shard);
    println!(
        "  size:            {:.1} MiB",
        (plan.bytes_per_shard() * plan.shard_count as usize) as f64 / (1024.0 * 1024.0)
    );
    println!("  estimated FPR:   {:.3e}\n", plan.expected_fp_rate());
}

fn main() {
    println!("Breached password filter capacity planning\n");

    let configs = [
        ("Top 10k passwords", 10_000u64, 0.001f32),
        ("Seen 100+ times", 2_700_000, 0.001),
        ("Seen 10+ times", 60_000_000, 0.001),
        ("Full corpus", 850_000_000, 0.001),
        ("Full corpus, strict", 850_000_000, 1e-6),
    ];

    for (name, capacity, rate) in configs {
        match params::plan(capacity, rate) {
            Ok(plan) => report(name, &plan),
            Err(e) => println!("{name}\n  {e}\n"),
        }
    }

    for capacity in [1_000u64, 1_000_000] {
        match params::plan_with_default_rate(capacity) {
            Ok(plan) => report(&format!("{capacity} with default rate"), &plan),
            Err(e) => println!("{capacity} with default rate\n  {e}\n"),
        }
    }
}

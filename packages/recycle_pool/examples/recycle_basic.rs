//! Demonstrates recycling expensive objects through a limited `RecyclePool`.
//!
//! Each "connection" takes a while to set up, so the pool keeps released ones around and
//! hands them out again instead of connecting anew.
//!
//! Run with: `cargo run --example recycle_basic`.
#![expect(
    clippy::arithmetic_side_effects,
    reason = "this is example code that does not need production-level safety"
)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use std::time::Duration;

use new_zealand::nz;
use recycle_pool::RecyclePool;

#[derive(Debug)]
struct Connection {
    id: u32,
    requests_served: u32,
}

fn main() -> Result<(), recycle_pool::Error> {
    let next_id = AtomicU32::new(0);

    let pool = RecyclePool::builder(move || {
        // Pretend that establishing a connection is slow.
        thread::sleep(Duration::from_millis(10));

        Connection {
            id: next_id.fetch_add(1, Ordering::Relaxed),
            requests_served: 0,
        }
    })
    .limit(nz!(2))
    .build();

    for request in 0..5 {
        let Some(mut connection) = pool.acquire()? else {
            println!("request {request}: no connection available");
            continue;
        };

        connection.requests_served += 1;
        println!(
            "request {request}: served by connection {} ({} requests so far)",
            connection.id, connection.requests_served
        );

        // The connection goes back to the pool here.
    }

    let first = pool.acquire()?.expect("the pool has recycled connections");
    let second = pool.acquire()?.expect("the pool has room for a second connection");
    println!("holding connections {} and {}", first.id, second.id);

    if pool.acquire()?.is_none() {
        println!("pool is exhausted while both connections are held");
    }

    println!(
        "allocated: {}, pooled: {}, checked out: {}",
        pool.allocated(),
        pool.pooled(),
        pool.checked_out()
    );

    Ok(())
}

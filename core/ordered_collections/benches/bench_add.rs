//! Benchmarks for the add operations in various data structures.
//!
//! This benchmark tests the performance of random add operations on the supported data structures in this crate,
//! Red-Black Trees (RBT) and Binary Search Trees (BST), with `std::collections::BTreeSet` as a baseline.
//!
//! ## Benchmark execution
//!
//! Running this exact benchmark can be done with the following command:
//!
//! `> cargo bench -p ordered_collections --bench bench_add`
//!
//! If you wish to run a subset of benchmarks in this file, you can filter them by name:
//!
//! `> cargo bench -p ordered_collections --bench bench_add -- <filter>`
//!
//! ## Examples
//!
//! ```bash
//! > cargo bench -p ordered_collections --bench bench_add -- rbt
//! > cargo bench -p ordered_collections --bench bench_add -- 32bit
//! > cargo bench -p ordered_collections --bench bench_add
//! ```
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
use criterion::{criterion_group, criterion_main, measurement::WallTime, BenchmarkGroup, BenchmarkId, Criterion};
use ordered_collections::{node_size, BlockPool, Bst, Rbt};
use rand::Rng;
use ruint::Uint;
use std::{
    collections::{BTreeSet, HashSet},
    hash::Hash,
};

const MAX_SIZE: usize = 4096;

type U384 = Uint<384, 6>;

fn random_numbers<D>(min: D, max: D) -> Vec<D>
where
    D: Copy + Eq + std::cmp::PartialOrd + Hash + rand::distributions::uniform::SampleUniform,
{
    let mut rng = rand::thread_rng();
    let mut nums: HashSet<D> = HashSet::new();
    while nums.len() < MAX_SIZE {
        let num: D = rng.gen_range(min..=max);
        nums.insert(num);
    }
    nums.into_iter().collect()
}

/// Memory for a block pool holding every element plus the sentinel.
fn pool_memory<D>() -> Vec<u8> {
    vec![0; (MAX_SIZE + 1) * node_size::<D>() + 64]
}

fn bench_width<D: Ord + Copy>(group: &mut BenchmarkGroup<'_, WallTime>, width: &str, nums: &[D]) {
    group.bench_with_input(BenchmarkId::new("rbt", width), nums, |b, nums| {
        let mut mem = pool_memory::<D>();
        b.iter(|| {
            let pool = BlockPool::new::<D>(&mut mem);
            let mut rbt = Rbt::new_in(&pool);

            for i in nums {
                rbt.push(*i).unwrap();
            }
        })
    });

    group.bench_with_input(BenchmarkId::new("bst", width), nums, |b, nums| {
        let mut mem = pool_memory::<D>();
        b.iter(|| {
            let pool = BlockPool::new::<D>(&mut mem);
            let mut bst = Bst::new_in(&pool);

            for i in nums {
                bst.push(*i).unwrap();
            }
        })
    });

    group.bench_with_input(BenchmarkId::new("rbt_global", width), nums, |b, nums| {
        b.iter(|| {
            let mut rbt = Rbt::new();

            for i in nums {
                rbt.push(*i).unwrap();
            }
        })
    });

    group.bench_with_input(BenchmarkId::new("btreeset", width), nums, |b, nums| {
        b.iter(|| {
            let mut set = BTreeSet::new();

            for i in nums {
                set.insert(*i);
            }
        })
    });
}

pub fn benchmark_add_function(c: &mut Criterion) {
    let mut group = c.benchmark_group("add");

    let nums = random_numbers::<u32>(0, 100_000);
    bench_width(&mut group, "32bit", &nums);

    let nums = random_numbers::<i128>(0, 100_000);
    bench_width(&mut group, "128bit", &nums);

    let nums: Vec<U384> = random_numbers::<u32>(0, 100_000).into_iter().map(U384::from).collect();
    bench_width(&mut group, "384bit", &nums);

    group.finish()
}

criterion_group!(benches, benchmark_add_function);
criterion_main!(benches);

//! Benchmarks for the delete operations in various data structures.
//!
//! Each iteration deletes every element of a freshly filled tree in random order, on the Red-Black Tree (RBT), the
//! Binary Search Tree (BST), and `std::collections::BTreeSet` as a baseline.
//!
//! ## Benchmark execution
//!
//! `> cargo bench -p ordered_collections --bench bench_delete`
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
use criterion::{
    criterion_group, criterion_main, measurement::WallTime, BatchSize, BenchmarkGroup, BenchmarkId, Criterion,
};
use ordered_collections::{Bst, Rbt};
use rand::{prelude::SliceRandom, Rng};
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

fn bench_width<D: Ord + Copy>(group: &mut BenchmarkGroup<'_, WallTime>, width: &str, nums: &[D]) {
    let mut nums_shuffled = nums.to_vec();
    nums_shuffled.shuffle(&mut rand::thread_rng());

    group.bench_function(BenchmarkId::new("rbt", width), |b| {
        b.iter_batched_ref(
            || nums.iter().copied().collect::<Rbt<D>>(),
            |rbt| {
                for i in &nums_shuffled {
                    rbt.remove(i).unwrap();
                }
            },
            BatchSize::PerIteration,
        );
    });

    group.bench_function(BenchmarkId::new("bst", width), |b| {
        b.iter_batched_ref(
            || nums.iter().copied().collect::<Bst<D>>(),
            |bst| {
                for i in &nums_shuffled {
                    bst.remove(i).unwrap();
                }
            },
            BatchSize::PerIteration,
        );
    });

    group.bench_function(BenchmarkId::new("btreeset", width), |b| {
        b.iter_batched_ref(
            || nums.iter().copied().collect::<BTreeSet<D>>(),
            |set| {
                for i in &nums_shuffled {
                    assert!(set.remove(i));
                }
            },
            BatchSize::PerIteration,
        );
    });
}

fn benchmark_delete_function(c: &mut Criterion) {
    let mut group = c.benchmark_group("delete");

    let nums = random_numbers::<u32>(0, 100_000);
    bench_width(&mut group, "32bit", &nums);

    let nums = random_numbers::<i128>(0, 100_000);
    bench_width(&mut group, "128bit", &nums);

    let nums: Vec<U384> = random_numbers::<u32>(0, 100_000).into_iter().map(U384::from).collect();
    bench_width(&mut group, "384bit", &nums);

    group.finish()
}

criterion_group!(benches, benchmark_delete_function);
criterion_main!(benches);

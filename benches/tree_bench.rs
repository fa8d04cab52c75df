// Tree engine benchmarks.
//
// Covers the leaf write path, commit with and without a retention floor,
// proof generation against a warm tree, and proof verification.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use coppice::{MemoryStore, Sha256Hasher, SparseMerkleTree, TreeHasher};

const DEPTH: u8 = 16;

fn nil_leaf() -> Vec<u8> {
    Sha256Hasher.digest(b"bench:nil")
}

/// A tree preloaded with `keys` committed entries, one commit.
fn seeded_tree(keys: u64) -> SparseMerkleTree<Sha256Hasher, MemoryStore> {
    let mut tree = SparseMerkleTree::in_memory(Sha256Hasher, DEPTH, nil_leaf()).unwrap();
    for key in 0..keys {
        let value = Sha256Hasher.digest(&key.to_be_bytes());
        tree.set(key * 37 % (1 << DEPTH), value).unwrap();
    }
    tree.commit(None).unwrap();
    tree
}

fn bench_set(c: &mut Criterion) {
    let mut tree = seeded_tree(1024);
    let value = Sha256Hasher.digest(b"payload");
    let mut key = 0u64;

    c.bench_function("tree/set", |b| {
        b.iter(|| {
            key = (key + 1) % (1 << DEPTH);
            tree.set(key, value.clone()).unwrap();
        })
    });
}

fn bench_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree/commit");
    for batch in [1u64, 16, 256] {
        group.throughput(Throughput::Elements(batch));
        group.bench_with_input(BenchmarkId::from_parameter(batch), &batch, |b, &batch| {
            let mut tree = seeded_tree(1024);
            let mut key = 0u64;
            b.iter(|| {
                for _ in 0..batch {
                    key = (key + 1) % (1 << DEPTH);
                    let value = Sha256Hasher.digest(&key.to_be_bytes());
                    tree.set(key, value).unwrap();
                }
                let floor = tree.latest_version().saturating_sub(2);
                if floor > 0 {
                    tree.commit(Some(floor)).unwrap();
                } else {
                    tree.commit(None).unwrap();
                }
            })
        });
    }
    group.finish();
}

fn bench_get_proof(c: &mut Criterion) {
    let mut tree = seeded_tree(1024);
    let mut key = 0u64;

    c.bench_function("tree/get_proof", |b| {
        b.iter(|| {
            key = (key + 37) % 1024;
            tree.get_proof(key * 37 % (1 << DEPTH)).unwrap()
        })
    });
}

fn bench_verify_proof(c: &mut Criterion) {
    let mut tree = seeded_tree(1024);
    let proof = tree.get_proof(37).unwrap();

    c.bench_function("tree/verify_proof", |b| {
        b.iter(|| assert!(tree.verify_proof(37, &proof)))
    });
}

criterion_group!(
    benches,
    bench_set,
    bench_commit,
    bench_get_proof,
    bench_verify_proof
);
criterion_main!(benches);

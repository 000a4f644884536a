#![cfg(all(feature = "criterion-bench", feature = "memory-store"))]

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use futures::executor::block_on;
use rs_rbac::{Engine, EngineBuilder, MemoryStore, ResourceId, RoleId, UserId};

fn setup_flat() -> (Engine<MemoryStore>, UserId, RoleId, ResourceId) {
    let engine = block_on(EngineBuilder::new(MemoryStore::new()).build()).unwrap();
    let user = UserId::try_from("user_bench").unwrap();
    let role = RoleId::try_from("role_reader").unwrap();
    let resource = ResourceId::try_from("invoice:read").unwrap();

    block_on(engine.add_resource(resource.clone())).unwrap();
    block_on(engine.set_role(&role, None)).unwrap();
    block_on(engine.allow(&role, &[resource.clone()])).unwrap();
    block_on(engine.related(&user, &[role.clone()])).unwrap();

    (engine, user, role, resource)
}

fn setup_chain(depth: usize) -> (Engine<MemoryStore>, UserId, ResourceId) {
    let engine = block_on(
        EngineBuilder::new(MemoryStore::new())
            .max_inherit_depth(depth + 2)
            .build(),
    )
    .unwrap();
    let user = UserId::try_from("user_chain_bench").unwrap();
    let resource = ResourceId::try_from("invoice:read").unwrap();
    block_on(engine.add_resource(resource.clone())).unwrap();

    let root = RoleId::try_from("role_chain_0").unwrap();
    block_on(engine.set_role(&root, None)).unwrap();
    block_on(engine.allow(&root, &[resource.clone()])).unwrap();
    let mut parent = root;
    for i in 1..=depth {
        let current = RoleId::try_from(format!("role_chain_{i}").as_str()).unwrap();
        block_on(engine.set_role(&current, Some(&parent))).unwrap();
        parent = current;
    }
    block_on(engine.related(&user, &[parent])).unwrap();

    (engine, user, resource)
}

/// One user holding `role_count` unrelated roles; only the last one grants
/// the required resource.
fn setup_role_fanout(role_count: usize) -> (Engine<MemoryStore>, UserId, ResourceId) {
    let engine = block_on(EngineBuilder::new(MemoryStore::new()).build()).unwrap();
    let user = UserId::try_from("user_fanout_bench").unwrap();

    let mut roles = Vec::with_capacity(role_count);
    let mut required = None;
    for i in 0..role_count {
        let role = RoleId::try_from(format!("role_{i}").as_str()).unwrap();
        let resource = ResourceId::try_from(format!("invoice_{i}:read").as_str()).unwrap();
        block_on(engine.add_resource(resource.clone())).unwrap();
        block_on(engine.set_role(&role, None)).unwrap();
        block_on(engine.allow(&role, &[resource.clone()])).unwrap();
        roles.push(role);
        required = Some(resource);
    }
    block_on(engine.related(&user, &roles)).unwrap();

    (engine, user, required.unwrap())
}

fn bench_flat(c: &mut Criterion) {
    let mut group = c.benchmark_group("is_allow_flat");
    group.sample_size(30);
    group.throughput(Throughput::Elements(1));

    let (engine, user, role, resource) = setup_flat();
    group.bench_function("user", |b| {
        b.iter(|| {
            let allowed = block_on(engine.is_allow(user.clone(), &resource)).unwrap();
            black_box(allowed);
        });
    });
    group.bench_function("role", |b| {
        b.iter(|| {
            let allowed = block_on(engine.is_allow(role.clone(), &resource)).unwrap();
            black_box(allowed);
        });
    });

    let denied = ResourceId::try_from("customer:read").unwrap();
    group.bench_function("user_denied", |b| {
        b.iter(|| {
            let allowed = block_on(engine.is_allow(user.clone(), &denied)).unwrap();
            assert!(!allowed);
            black_box(allowed);
        });
    });

    group.finish();
}

fn bench_chain_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("is_allow_chain_depth");
    group.sample_size(30);
    group.throughput(Throughput::Elements(1));

    for depth in [1usize, 4, 8, 16] {
        let (engine, user, resource) = setup_chain(depth);
        let id = BenchmarkId::from_parameter(depth);
        group.bench_with_input(id, &depth, |b, _| {
            b.iter(|| {
                let allowed = block_on(engine.is_allow(user.clone(), &resource)).unwrap();
                black_box(allowed);
            });
        });
    }

    group.finish();
}

fn bench_role_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("is_allow_role_fanout");
    group.sample_size(30);
    group.throughput(Throughput::Elements(1));

    for role_count in [1usize, 8, 32, 128] {
        let (engine, user, required) = setup_role_fanout(role_count);
        let id = BenchmarkId::from_parameter(role_count);
        group.bench_with_input(id, &role_count, |b, _| {
            b.iter(|| {
                let allowed = block_on(engine.is_allow(user.clone(), &required)).unwrap();
                black_box(allowed);
            });
        });
    }

    group.finish();
}

fn bench_mutations(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_through");
    group.sample_size(30);
    group.throughput(Throughput::Elements(2));

    let (engine, _, role, resource) = setup_flat();
    group.bench_function("deny_then_allow", |b| {
        b.iter(|| {
            block_on(engine.deny(&role, &[resource.clone()])).unwrap();
            block_on(engine.allow(&role, &[resource.clone()])).unwrap();
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_flat,
    bench_chain_depth,
    bench_role_fanout,
    bench_mutations
);
criterion_main!(benches);

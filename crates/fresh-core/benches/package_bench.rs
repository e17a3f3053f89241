use criterion::{criterion_group, criterion_main, Criterion};
use fresh_core::{register_class, ClassInfo, Object, ObjectCore, ObjectRef, Package};
use std::hint::black_box;
use std::rc::Rc;

struct Prop {
    core: ObjectCore,
}

impl Object for Prop {
    fn core(&self) -> &ObjectCore {
        &self.core
    }
}

fn prop_class() -> Rc<ClassInfo> {
    register_class("BenchProp", "Object", |core| Rc::new(Prop { core }) as ObjectRef)
        .expect("the Object class is always registered")
}

fn filled_package(class: &Rc<ClassInfo>, count: usize) -> (Rc<Package>, Vec<ObjectRef>) {
    let package = Package::new("bench");
    let mut props = Vec::with_capacity(count);
    for i in 0..count {
        let prop = class.instantiate(&format!("prop_{i}")).unwrap();
        package.add(prop.clone());
        props.push(prop);
    }
    (package, props)
}

fn bench_lookup(c: &mut Criterion) {
    let class = prop_class();
    let (package, _props) = filled_package(&class, 10_000);

    let mut group = c.benchmark_group("Package Lookup");

    group.bench_function("find_generic (hit, last member)", |b| {
        b.iter(|| black_box(package.find_generic(&class, black_box("prop_9999"))));
    });

    group.bench_function("find_generic (miss)", |b| {
        b.iter(|| black_box(package.find_generic(&class, black_box("absent"))));
    });

    group.finish();
}

fn bench_tidy(c: &mut Criterion) {
    let class = prop_class();
    let mut group = c.benchmark_group("Package Tidy");

    // Every other member dies, leaving null slots for the tidy passes.
    group.bench_function("quick_tidy (half dead)", |b| {
        b.iter_batched(
            || {
                let (package, mut props) = filled_package(&class, 1_000);
                props.retain(|p| p.name().ends_with(['0', '2', '4', '6', '8']));
                (package, props)
            },
            |(package, props)| {
                for _ in 0..10 {
                    package.quick_tidy();
                }
                black_box(props.len());
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.bench_function("tidy (half dead)", |b| {
        b.iter_batched(
            || {
                let (package, mut props) = filled_package(&class, 1_000);
                props.retain(|p| p.name().ends_with(['0', '2', '4', '6', '8']));
                (package, props)
            },
            |(package, props)| {
                package.tidy();
                black_box(props.len());
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_lookup, bench_tidy);
criterion_main!(benches);

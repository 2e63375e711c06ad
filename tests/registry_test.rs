#![allow(missing_docs)]

use packable::{Codec, PackError, Packable, Packer, Registry, Strategy, WireRead, WireWrite};
use std::sync::{Arc, Barrier};
use std::thread;

#[derive(Packable, Default, Debug, Clone, PartialEq)]
struct Telemetry {
    id: i64,
    label: String,
    samples: Vec<i32>,
}

#[derive(Packable, Default, Debug, Clone, PartialEq)]
struct Gauge {
    id: i32,
    ratio: f64,
}

#[derive(Packable, Default, Debug, Clone, PartialEq)]
struct Panel {
    name: String,
    gauges: Vec<Gauge>,
}

#[derive(Packable, Default, Debug, Clone, PartialEq)]
struct Outer {
    inner: Inner,
    bad: f64,
}

#[derive(Packable, Default, Debug, Clone, PartialEq)]
struct Inner {
    id: i32,
    back: Option<Box<Outer>>,
}

fn private_packer(registry: &Registry) -> Packer {
    Packer::builder().registry(registry.clone()).build()
}

#[test]
fn test_concurrent_first_use_builds_once() {
    const THREADS: usize = 8;
    let registry = Registry::new();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let registry = registry.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let descriptor = registry.resolve::<Telemetry>().expect("resolve");
                let strategy = if i % 2 == 0 {
                    Strategy::Generic
                } else {
                    Strategy::Specialized
                };
                let bytes = Packer::builder()
                    .registry(registry)
                    .strategy(strategy)
                    .build()
                    .to_bytes(&Telemetry {
                        id: 7,
                        label: "cpu".into(),
                        samples: vec![1, 2, 3],
                    })
                    .expect("pack");
                (descriptor, bytes)
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("thread panicked"))
        .collect();

    assert_eq!(registry.build_count(), 1);
    assert!(registry.is_resolved::<Telemetry>());
    let (first_descriptor, first_bytes) = &results[0];
    for (descriptor, bytes) in &results[1..] {
        assert!(Arc::ptr_eq(first_descriptor, descriptor));
        assert_eq!(first_bytes, bytes);
    }
}

#[test]
fn test_nested_types_are_built_once_each() -> packable::Result<()> {
    let registry = Registry::new();
    registry.register_primitive::<f64>(f64_codec());
    let packer = private_packer(&registry);

    let panel = Panel {
        name: "main".into(),
        gauges: vec![Gauge { id: 1, ratio: 0.5 }, Gauge { id: 2, ratio: -1.25 }],
    };
    let bytes = packer.to_bytes(&panel)?;
    assert_eq!(registry.build_count(), 2);

    let loaded: Panel = packer.from_bytes(&bytes)?;
    assert_eq!(loaded, panel);
    assert_eq!(registry.build_count(), 2);
    Ok(())
}

#[test]
fn test_unsupported_member_fails_before_writing() {
    let registry = Registry::new();
    let packer = private_packer(&registry);
    let panel = Panel {
        name: "main".into(),
        gauges: vec![Gauge { id: 1, ratio: 0.5 }],
    };

    for _ in 0..3 {
        let mut sink = Vec::new();
        let result = packer.pack(&panel, &mut sink);
        assert!(matches!(result, Err(PackError::UnsupportedType("f64"))));
        assert!(sink.is_empty());
    }
    assert!(matches!(
        packer.from_bytes::<Gauge>(&[0; 12]),
        Err(PackError::UnsupportedType("f64"))
    ));

    assert_eq!(registry.build_count(), 0);
    assert!(!registry.is_resolved::<Panel>());
    assert!(!registry.is_resolved::<Gauge>());
}

#[test]
fn test_failed_build_discards_nested_descriptors() {
    let registry = Registry::new();
    let packer = private_packer(&registry);

    assert!(matches!(
        registry.resolve::<Outer>(),
        Err(PackError::UnsupportedType("f64"))
    ));
    assert!(!registry.is_resolved::<Outer>());
    assert!(!registry.is_resolved::<Inner>());
    assert_eq!(registry.build_count(), 0);

    // Inner refers back to Outer, so it is just as unpackable.
    let inner = Inner {
        id: 5,
        back: Some(Box::new(Outer::default())),
    };
    let mut sink = Vec::new();
    assert!(matches!(
        packer.pack(&inner, &mut sink),
        Err(PackError::UnsupportedType("f64"))
    ));
    assert!(sink.is_empty());
    assert_eq!(registry.build_count(), 0);
}

#[test]
fn test_mutually_recursive_types_publish_together() -> packable::Result<()> {
    let registry = Registry::new();
    registry.register_primitive::<f64>(f64_codec());
    let packer = private_packer(&registry);

    let outer = Outer {
        inner: Inner {
            id: 1,
            back: Some(Box::new(Outer {
                inner: Inner { id: 2, back: None },
                bad: 0.25,
            })),
        },
        bad: 1.5,
    };
    let bytes = packer.to_bytes(&outer)?;
    assert_eq!(registry.build_count(), 2);
    assert!(registry.is_resolved::<Outer>());
    assert!(registry.is_resolved::<Inner>());

    assert_eq!(packer.from_bytes::<Outer>(&bytes)?, outer);
    assert_eq!(registry.build_count(), 2);
    Ok(())
}

fn f64_codec() -> Codec<f64> {
    Codec::from_fns(
        |v, sink| sink.write_int64(v.to_bits() as i64),
        |source| Ok(f64::from_bits(source.read_int64()? as u64)),
    )
}

#[test]
fn test_registered_primitive_makes_type_packable() -> packable::Result<()> {
    let registry = Registry::new();
    assert!(registry.primitive::<f64>().is_none());
    registry.register_primitive::<f64>(f64_codec());
    assert!(registry.primitive::<f64>().is_some());

    let packer = private_packer(&registry);
    let gauge = Gauge { id: 3, ratio: 2.5 };
    let bytes = packer.to_bytes(&gauge)?;

    let mut expected = 3i32.to_le_bytes().to_vec();
    expected.extend_from_slice(&2.5f64.to_bits().to_le_bytes());
    assert_eq!(bytes, expected);
    assert_eq!(packer.from_bytes::<Gauge>(&bytes)?, gauge);
    Ok(())
}

#[test]
fn test_registries_are_isolated() {
    let with_f64 = Registry::new();
    with_f64.register_primitive::<f64>(f64_codec());
    let without = Registry::new();

    assert!(private_packer(&with_f64).to_bytes(&Gauge::default()).is_ok());
    assert!(private_packer(&without).to_bytes(&Gauge::default()).is_err());
}

#[test]
fn test_descriptor_lists_included_members() -> packable::Result<()> {
    let registry = Registry::new();
    let descriptor = registry.resolve::<Telemetry>()?;

    let names: Vec<_> = descriptor.members().iter().map(|m| m.name()).collect();
    assert_eq!(names, ["id", "label", "samples"]);
    assert!(descriptor.members()[0].is_value_type());
    assert!(!descriptor.members()[1].is_value_type());
    assert!(descriptor.skipped().is_empty());

    let again = registry.resolve::<Telemetry>()?;
    assert!(Arc::ptr_eq(&descriptor, &again));
    Ok(())
}

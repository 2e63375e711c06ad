#![allow(missing_docs)]

use packable::{hex_dump, PackError, PackOptions, Packable, Packer, Registry, Strategy};
use std::collections::BTreeMap;
use std::io::{Cursor, Seek, SeekFrom};
use tempfile::NamedTempFile;

#[derive(Packable, Default, Debug, Clone, PartialEq)]
struct LevelState {
    id: u32,
    name: String,
    indices: Vec<u64>,
    #[pack(exclude)]
    loaded: bool,
}

fn create_level() -> LevelState {
    LevelState {
        id: 42,
        name: "Dungeon_01".into(),
        indices: (0..10_000).map(|i| i * 2).collect(),
        loaded: true,
    }
}

/// Standard File IO
/// Validate `Packer::save`, `Packer::load`
#[test]
fn test_standard_file_io() -> packable::Result<()> {
    let dir = tempfile::tempdir()?;
    let file_path = dir.path().join("level.bin");
    let level = create_level();
    let packer = Packer::new();

    packer.save(&file_path, &level)?;
    let loaded: LevelState = packer.load(&file_path)?;

    assert_eq!(loaded, LevelState { loaded: false, ..level });
    Ok(())
}

/// Streaming into an open file handle
/// Validate `Packer::pack` / `Packer::unpack_new` on `std::fs::File`
#[test]
fn test_pack_into_file_handle() -> packable::Result<()> {
    let mut file = NamedTempFile::new()?;
    let first = create_level();
    let second = LevelState { id: 7, name: "Boss".into(), indices: vec![], loaded: false };
    let packer = Packer::builder().strategy(Strategy::Specialized).build();

    packer.pack(&first, file.as_file_mut())?;
    packer.pack(&second, file.as_file_mut())?;
    file.as_file_mut().seek(SeekFrom::Start(0))?;

    let a: LevelState = packer.unpack_new(file.as_file_mut())?;
    let b: LevelState = packer.unpack_new(file.as_file_mut())?;
    assert_eq!(a.indices, first.indices);
    assert_eq!(b, second);

    // The stream is exhausted.
    assert!(matches!(
        packer.unpack_new::<LevelState, _>(file.as_file_mut()),
        Err(PackError::TruncatedStream)
    ));
    Ok(())
}

/// Pure Memory IO
/// Validate `Packable::pack`, `Packable::unpack` through a cursor
#[test]
fn test_memory_io() -> packable::Result<()> {
    let level = create_level();
    let mut cursor = Cursor::new(Vec::new());

    level.pack(&mut cursor)?;
    cursor.set_position(0);

    let mut loaded = LevelState::default();
    loaded.unpack(&mut cursor)?;
    assert_eq!(loaded.name, level.name);
    assert_eq!(cursor.position() as usize, cursor.get_ref().len());
    Ok(())
}

/// Top-level values
/// Validate `Packer::write_value`, `Packer::read_value`
#[test]
fn test_top_level_values() -> packable::Result<()> {
    let packer = Packer::new();
    let mut buffer = Vec::new();

    let scores = BTreeMap::from([("a".to_string(), 1), ("b".to_string(), 2)]);
    packer.write_value(&scores, &mut buffer)?;
    packer.write_value(&Some(5i16), &mut buffer)?;
    packer.write_value(&None::<String>, &mut buffer)?;
    packer.write_value(&0x0102_0304i32, &mut buffer)?;

    let mut source = &buffer[..];
    let back: BTreeMap<String, i32> = packer.read_value(&mut source)?;
    assert_eq!(back, scores);
    assert_eq!(packer.read_value::<Option<i16>, _>(&mut source)?, Some(5));
    assert_eq!(packer.read_value::<Option<String>, _>(&mut source)?, None);
    assert_eq!(packer.read_value::<i32, _>(&mut source)?, 0x0102_0304);
    assert!(source.is_empty());

    assert_eq!(hex_dump(&0x0102_0304i32.to_le_bytes()), "0x04, 0x03, 0x02, 0x01");
    Ok(())
}

/// Options
/// Validate `PackerBuilder::options`, `PackerBuilder::registry`
#[test]
fn test_builder_configuration() -> packable::Result<()> {
    let registry = Registry::new();
    let packer = Packer::builder()
        .options(PackOptions { strategy: Strategy::Specialized })
        .registry(registry.clone())
        .build();

    assert_eq!(packer.options().strategy, Strategy::Specialized);
    assert_eq!(registry.build_count(), 0);

    let level = create_level();
    let bytes = packer.to_bytes(&level)?;
    assert_eq!(registry.build_count(), 1);
    assert_eq!(bytes, Packer::new().to_bytes(&level)?);
    Ok(())
}

/// Options loaded from a host application's config
#[cfg(feature = "serde")]
#[test]
fn test_options_serde() {
    let options = PackOptions { strategy: Strategy::Specialized };
    let bytes = bincode::serde::encode_to_vec(options, bincode::config::standard())
        .expect("encode options");
    let (decoded, _): (PackOptions, usize) =
        bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
            .expect("decode options");
    assert_eq!(decoded, options);
}

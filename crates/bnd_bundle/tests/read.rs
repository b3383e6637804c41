use bnd_bundle::error::{Error, ErrorCategory};
use bnd_bundle::types::{BundleFlags, ImportEntry};
use bnd_bundle::{resolve, Bundle, BundleBuilder, ParseOptions, Platform, ResourceType};
use pretty_assertions::assert_eq;
use tracing_test::traced_test;

const DEBUG_XML: &str = "<ResourceStringTable>\
    <Resource Id=\"0000000000000001\" Name=\"gamedb://vehicles\" TypeName=\"VehicleList\"/>\
    <Resource Id=\"0000000000000002\" Name=\"gamedb://triggers\" TypeName=\"TriggerData\"/>\
    </ResourceStringTable>";

fn base_bundle(platform: Platform) -> Result<Vec<u8>, Error> {
    BundleBuilder::new(platform)
        .add(1, ResourceType::VEHICLE_LIST, b"vehicle payload!".to_vec(), false)
        .add(2, ResourceType::TRIGGER_DATA, vec![0x11; 0x40], true)
        .add(3, ResourceType::TRIGGER_DATA, vec![0x22; 0x20], false)
        .build()
}

fn put_u32(data: &mut [u8], offset: usize, value: u32, big: bool) {
    let bytes = if big {
        value.to_be_bytes()
    } else {
        value.to_le_bytes()
    };
    data[offset..offset + 4].copy_from_slice(&bytes);
}

/// Append an import table for entry 0 and a debug table, then point the header and entry at them
fn with_imports_and_debug(platform: Platform) -> Result<Vec<u8>, Error> {
    let big = platform != Platform::Pc;
    let mut data = base_bundle(platform)?;

    let import_offset = data.len();
    for (id, offset) in [(2u64, 0x08u32), (3, 0x0C)] {
        let mut entry = [0u8; 16];
        if big {
            entry[0..8].copy_from_slice(&id.to_be_bytes());
            entry[8..12].copy_from_slice(&offset.to_be_bytes());
        } else {
            entry[0..8].copy_from_slice(&id.to_le_bytes());
            entry[8..12].copy_from_slice(&offset.to_le_bytes());
        }
        data.extend_from_slice(&entry);
    }

    let debug_offset = data.len();
    data.extend_from_slice(DEBUG_XML.as_bytes());
    data.push(0);

    put_u32(&mut data, 0x0C, debug_offset as u32, big);
    let flags = BundleFlags::COMPRESSED | BundleFlags::HAS_DEBUG_DATA;
    put_u32(&mut data, 0x24, flags, big);

    // entry 0: import offset at 0x34, import count at 0x3C
    put_u32(&mut data, 0x30 + 0x34, import_offset as u32, big);
    let count = if big { [0x00, 0x02] } else { [0x02, 0x00] };
    data[0x30 + 0x3C..0x30 + 0x3E].copy_from_slice(&count);

    Ok(data)
}

#[traced_test]
#[test]
fn parse_imports_and_debug_data() -> Result<(), Error> {
    for platform in [Platform::Pc, Platform::Xbox360, Platform::Ps3] {
        let data = with_imports_and_debug(platform)?;
        let bundle = Bundle::parse(&data, &ParseOptions::default())?;

        assert_eq!(bundle.platform, platform);
        assert_eq!(bundle.endian, platform.endian());
        assert_eq!(bundle.len(), 3);

        let vehicles = bundle.by_id(1).unwrap();
        assert_eq!(
            vehicles.imports,
            vec![
                ImportEntry {
                    resource_id: 2,
                    offset: 0x08,
                    padding: 0
                },
                ImportEntry {
                    resource_id: 3,
                    offset: 0x0C,
                    padding: 0
                },
            ]
        );

        assert_eq!(bundle.debug_name(1), Some("gamedb://vehicles"));
        assert_eq!(bundle.debug_name(2), Some("gamedb://triggers"));
        assert_eq!(bundle.debug_name(3), None);
        assert_eq!(
            bundle.debug_data.as_ref().unwrap().text(),
            DEBUG_XML.to_string()
        );
    }

    Ok(())
}

#[test]
fn lookups_follow_directory_order() -> Result<(), Error> {
    let data = base_bundle(Platform::Pc)?;
    let bundle = Bundle::parse(&data, &ParseOptions::default())?;

    assert_eq!(bundle.by_type(ResourceType::TRIGGER_DATA).unwrap().id(), 2);
    assert_eq!(
        bundle
            .resources_of_type(ResourceType::TRIGGER_DATA)
            .map(|r| r.id())
            .collect::<Vec<_>>(),
        vec![2, 3]
    );
    assert_eq!(bundle.by_index(2).unwrap().id(), 3);
    assert!(bundle.by_index(3).is_none());
    assert!(bundle.by_type(ResourceType::CHALLENGE_LIST).is_none());

    let compressed = bundle.by_id(2).unwrap();
    let payload = resolve(&bundle, compressed, &data)?.unwrap();
    assert!(payload.was_compressed);
    assert_eq!(payload.bytes, vec![0x11; 0x40]);

    Ok(())
}

#[traced_test]
#[test]
fn duplicate_ids() -> Result<(), Error> {
    let mut data = base_bundle(Platform::Pc)?;
    // give entry 2 the id of entry 1
    data[0x30 + 2 * 0x50] = 0x02;

    let result = Bundle::parse(&data, &ParseOptions::default());
    let error = result.unwrap_err();
    assert!(matches!(
        error,
        Error::DuplicateResourceId { id: 2, entry: 2 }
    ));
    assert_eq!(error.category(), ErrorCategory::Structural);

    let bundle = Bundle::parse(&data, &ParseOptions::lenient())?;
    assert_eq!(bundle.len(), 2);
    assert_eq!(bundle.by_id(2).unwrap().index, 1);
    assert_eq!(bundle.warnings.len(), 1);
    assert_eq!(bundle.warnings[0].code, "bnd_bundle::duplicate_id");
    assert!(logs_contain("duplicate resource id"));

    Ok(())
}

#[test]
fn import_table_out_of_bounds() -> Result<(), Error> {
    let mut data = base_bundle(Platform::Pc)?;
    put_u32(&mut data, 0x30 + 0x34, 0xFFFF_0000, false);
    data[0x30 + 0x3C] = 0x01;

    assert!(matches!(
        Bundle::parse(&data, &ParseOptions::default()),
        Err(Error::OutOfBounds {
            what: "import table",
            entry: Some(0),
            ..
        })
    ));

    let bundle = Bundle::parse(&data, &ParseOptions::lenient())?;
    assert!(bundle.by_id(1).is_none());
    assert_eq!(bundle.len(), 2);

    Ok(())
}

#[test]
fn misaligned_entry_table() {
    let mut data = base_bundle(Platform::Pc).unwrap();
    put_u32(&mut data, 0x14, 0x2E, false);

    assert!(matches!(
        Bundle::parse(&data, &ParseOptions::default()),
        Err(Error::Misaligned {
            what: "resource entry table",
            offset: 0x2E,
            alignment: 4,
            ..
        })
    ));
}

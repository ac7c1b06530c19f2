// SPDX-License-Identifier: Apache-2.0

//! Document emission through the public writer API, and write→read
//! round-trips for every scalar shape.

use pulljson::{
    ChunkReader, Error, JsonReader, JsonWriter, SliceWriter, StrRead, ValueRead, ValueWrite,
};

#[test]
fn builds_a_whole_document() {
    let mut buf = [0u8; 256];
    let mut writer = JsonWriter::new(SliceWriter::new(&mut buf));

    let mut root = writer.open_object().unwrap();
    root.member_separator().unwrap();
    root.write_key("menu").unwrap();
    root.key_separator().unwrap();
    {
        let mut menu = root.open_object().unwrap();
        menu.member_separator().unwrap();
        menu.write_key("header").unwrap();
        menu.key_separator().unwrap();
        menu.write_string("File").unwrap();

        menu.member_separator().unwrap();
        menu.write_key("items").unwrap();
        menu.key_separator().unwrap();
        {
            let mut items = menu.open_array().unwrap();
            items.element_separator().unwrap();
            items.write_string("Open").unwrap();
            items.element_separator().unwrap();
            items.write_null().unwrap();
            items.element_separator().unwrap();
            items.write_f64(1.25).unwrap();
            items.close().unwrap();
        }
        menu.close().unwrap();
    }
    root.close().unwrap();

    let sink = writer.finish().unwrap();
    assert_eq!(
        sink.as_bytes(),
        br#"{"menu":{"header":"File","items":["Open",null,1.25]}}"#
    );
}

#[test]
fn scalar_round_trips() {
    fn round_trip<F>(write: F) -> Vec<u8>
    where
        F: for<'a, 'b> FnOnce(&'a mut JsonWriter<SliceWriter<'b>>),
    {
        let mut buf = [0u8; 128];
        let mut writer = JsonWriter::new(SliceWriter::new(&mut buf));
        write(&mut writer);
        writer.finish().unwrap().as_bytes().to_vec()
    }

    // Booleans and null.
    let text = round_trip(|w| w.write_bool(true).unwrap());
    assert_eq!(
        JsonReader::new(ChunkReader::full_slice(&text)).read_bool(),
        Ok(true)
    );
    let text = round_trip(|w| w.write_bool(false).unwrap());
    assert_eq!(
        JsonReader::new(ChunkReader::full_slice(&text)).read_bool(),
        Ok(false)
    );
    let text = round_trip(|w| w.write_null().unwrap());
    assert_eq!(
        JsonReader::new(ChunkReader::full_slice(&text)).read_null(),
        Ok(())
    );

    // Integers, including the extremes.
    for value in [0i64, 1, -1, 42, i64::MAX, i64::MIN] {
        let text = round_trip(|w| w.write_i64(value).unwrap());
        assert_eq!(
            JsonReader::new(ChunkReader::full_slice(&text)).read_i64(),
            Ok(value),
            "value {value}"
        );
    }

    // Doubles survive exactly within representable precision.
    for value in [0.0f64, -0.0, 1.5, 242.145525, 1.0e300, 5e-324, -2.5e-10] {
        let text = round_trip(|w| w.write_f64(value).unwrap());
        let read = JsonReader::new(ChunkReader::full_slice(&text))
            .read_f64()
            .unwrap();
        assert_eq!(read.to_bits(), value.to_bits(), "value {value}");
    }

    // Strings with control characters and non-ASCII text.
    for value in ["", "plain", "quote \" slash \\", "ctl \x01\n\t", "héllo 𝄞"] {
        let text = round_trip(|w| w.write_string(value).unwrap());
        let mut json = JsonReader::new(ChunkReader::full_slice(&text));
        let mut buf = [0u8; 64];
        match json.read_string(&mut buf).unwrap() {
            StrRead::Complete(n) => {
                assert_eq!(&buf[..n], value.as_bytes(), "value {value:?}")
            }
            other => panic!("expected complete read, got {other:?}"),
        }
    }
}

#[test]
fn copied_strings_round_trip_through_chunked_reads() {
    // Write, then read back through a 3-byte buffer with resumption.
    let mut buf = [0u8; 128];
    let mut writer = JsonWriter::new(SliceWriter::new(&mut buf));
    let original = "line one\nline \"two\" \u{10437} end";
    writer.write_string(original).unwrap();
    let text = writer.finish().unwrap().as_bytes().to_vec();

    let mut json = JsonReader::new(ChunkReader::full_slice(&text));
    let mut piece = [0u8; 3];
    let mut collected = Vec::new();
    let mut chunk = json.read_string(&mut piece).unwrap();
    loop {
        collected.extend_from_slice(&piece[..chunk.len()]);
        if chunk.is_complete() {
            break;
        }
        chunk = json.resume_string(&mut piece).unwrap();
    }
    assert_eq!(collected, original.as_bytes());
}

#[test]
fn full_sink_fails_cleanly() {
    // Capacity for the opening bracket only.
    let mut buf = [0u8; 1];
    let mut writer = JsonWriter::new(SliceWriter::new(&mut buf));
    let mut array = writer.open_array().unwrap();
    array.element_separator().unwrap();
    assert_eq!(array.write_string("x"), Err(Error::WriterError));
    // The sink stays full; the error repeats rather than panicking.
    assert_eq!(array.write_i32(1), Err(Error::WriterError));
}

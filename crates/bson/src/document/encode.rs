//! Element encoding into the BSON wire layout.

use bson_buffers::Writer;

use crate::value::Bson;

/// Encodes one full element record (type byte, key, terminator, value)
/// into a standalone byte vector.
pub(crate) fn element_bytes(key: &str, value: &Bson) -> Vec<u8> {
    let mut writer = Writer::new();
    encode_element(&mut writer, key, value);
    writer.flush()
}

pub(crate) fn encode_element(writer: &mut Writer, key: &str, value: &Bson) {
    writer.u8(value.element_type() as u8);
    writer.cstr(key);
    encode_value(writer, value);
}

pub(crate) fn encode_value(writer: &mut Writer, value: &Bson) {
    match value {
        Bson::Double(v) => writer.f64(*v),
        Bson::String(v) => write_string(writer, v),
        Bson::Document(v) => writer.buf(v.as_bytes()),
        Bson::Array(items) => {
            let mut body = Writer::new();
            for (i, item) in items.iter().enumerate() {
                encode_element(&mut body, &i.to_string(), item);
            }
            body.u8(0);
            let body = body.flush();
            writer.i32(body.len() as i32 + 4);
            writer.buf(&body);
        }
        Bson::Binary(v) => {
            writer.i32(v.bytes.len() as i32);
            writer.u8(v.subtype);
            writer.buf(&v.bytes);
        }
        Bson::Undefined | Bson::Null | Bson::MinKey | Bson::MaxKey => {}
        Bson::ObjectId(v) => writer.buf(&v.bytes()),
        Bson::Boolean(v) => writer.u8(*v as u8),
        Bson::DateTime(v) => writer.i64(v.millis()),
        Bson::Regex(v) => {
            writer.cstr(&v.pattern);
            writer.cstr(&v.options);
        }
        Bson::DbPointer(v) => {
            write_string(writer, &v.namespace);
            writer.buf(&v.id.bytes());
        }
        Bson::JavaScriptCode(v) => write_string(writer, v),
        Bson::Symbol(v) => write_string(writer, v),
        Bson::JavaScriptCodeWithScope(v) => {
            let code_len = v.code.len() as i32 + 1;
            let total = 4 + 4 + code_len + v.scope.as_bytes().len() as i32;
            writer.i32(total);
            write_string(writer, &v.code);
            writer.buf(v.scope.as_bytes());
        }
        Bson::Int32(v) => writer.i32(*v),
        Bson::Timestamp(v) => {
            writer.u32(v.increment);
            writer.u32(v.time);
        }
        Bson::Int64(v) => writer.i64(*v),
        Bson::Decimal128(v) => writer.buf(&v.bytes()),
    }
}

fn write_string(writer: &mut Writer, value: &str) {
    writer.i32(value.len() as i32 + 1);
    writer.utf8(value);
    writer.u8(0);
}

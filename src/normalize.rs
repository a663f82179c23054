//! Converts the raw `FileDescriptorProto` AST from the `protobuf` crate into
//! the lock's [`Entry`] representation.
//!
//! Source annotations decide what is left out (skip hints) and supply
//! options in their written form.

use crate::canonical::{
    Entry, Enum, EnumField, Field, Import, Map, Message, ReservedRange, Rpc, Service,
};
use crate::source::SourceAnnotations;
use protobuf::descriptor::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
    ServiceDescriptorProto, field_descriptor_proto,
};

/// The kinds of declaration that can appear inside a message body.
enum Member<'a> {
    Field(&'a FieldDescriptorProto),
    Map(&'a FieldDescriptorProto, &'a DescriptorProto),
    Message(&'a DescriptorProto),
    Enum(&'a EnumDescriptorProto),
}

pub fn normalize_file(file: &FileDescriptorProto, annotations: &SourceAnnotations) -> Entry {
    let package = file.package().to_string();
    let mut entry = Entry::default();

    for msg in file.message_type.iter() {
        let name = msg.name().to_string();
        if annotations.is_message_skipped(&name) {
            continue;
        }
        let (message, nested_enums) = normalize_message(msg, &name, &package, annotations);
        entry.messages.push(message);
        entry.enums.extend(nested_enums);
    }

    let mut enums: Vec<Enum> = file
        .enum_type
        .iter()
        .map(|en| normalize_enum(en, en.name(), annotations))
        .collect();
    enums.append(&mut entry.enums);
    entry.enums = enums;

    for svc in file.service.iter() {
        if annotations.is_service_skipped(svc.name()) {
            continue;
        }
        entry.services.push(normalize_service(svc, &package));
    }

    entry.imports = file
        .dependency
        .iter()
        .map(|path| Import { path: path.clone() })
        .collect();

    entry
}

/// Normalizes a message and its nested messages. Nested enums are returned
/// separately under their dotted names, since the lock keeps all enums at
/// file level.
fn normalize_message(
    msg: &DescriptorProto,
    dotted_name: &str,
    package: &str,
    annotations: &SourceAnnotations,
) -> (Message, Vec<Enum>) {
    let mut message = Message {
        name: msg.name().to_string(),
        options: annotations.message_options(dotted_name),
        ..Default::default()
    };
    let mut enums = Vec::new();

    for member in members(msg) {
        match member {
            Member::Field(field) => {
                let mut field = normalize_field(field, package);
                field.options = annotations.field_options(dotted_name, &field.name);
                message.fields.push(field);
            }
            Member::Map(field, entry) => {
                let mut map = normalize_map(field, entry, package);
                map.field.options = annotations.field_options(dotted_name, &map.field.name);
                message.maps.push(map);
            }
            Member::Message(nested) => {
                let nested_name = format!("{dotted_name}.{}", nested.name());
                if annotations.is_message_skipped(&nested_name) {
                    continue;
                }
                let (nested, nested_enums) =
                    normalize_message(nested, &nested_name, package, annotations);
                message.messages.push(nested);
                enums.extend(nested_enums);
            }
            Member::Enum(en) => {
                let enum_name = format!("{dotted_name}.{}", en.name());
                enums.push(normalize_enum(en, &enum_name, annotations));
            }
        }
    }

    for range in msg.reserved_range.iter() {
        // message reserved ranges are end-exclusive
        let span = ReservedRange {
            start: range.start(),
            end: range.end().saturating_sub(1),
        };
        add_reserved(span, &mut message.reserved_ids, &mut message.reserved_ranges);
    }
    message.reserved_names = msg.reserved_name.clone();

    (message, enums)
}

/// Classifies a message's members. Map fields are recognised by their
/// synthesized `map_entry` nested type, which is consumed by the map rather
/// than listed as a nested message.
fn members(msg: &DescriptorProto) -> Vec<Member<'_>> {
    let map_entry = |type_name: &str| {
        msg.nested_type.iter().find(|nested| {
            is_map_entry(nested) && type_name.rsplit('.').next() == Some(nested.name())
        })
    };

    let mut members = Vec::new();
    for field in msg.field.iter() {
        let entry = (field.label() == field_descriptor_proto::Label::LABEL_REPEATED)
            .then(|| map_entry(field.type_name()))
            .flatten();
        match entry {
            Some(entry) => members.push(Member::Map(field, entry)),
            None => members.push(Member::Field(field)),
        }
    }
    members.extend(
        msg.nested_type
            .iter()
            .filter(|nested| !is_map_entry(nested))
            .map(Member::Message),
    );
    members.extend(msg.enum_type.iter().map(Member::Enum));
    members
}

fn is_map_entry(msg: &DescriptorProto) -> bool {
    msg.options.as_ref().map(|o| o.map_entry()).unwrap_or(false)
}

fn normalize_field(field: &FieldDescriptorProto, package: &str) -> Field {
    Field {
        id: field.number(),
        name: field.name().to_string(),
        type_name: type_name(field, package),
        is_repeated: field.label() == field_descriptor_proto::Label::LABEL_REPEATED,
        options: Vec::new(),
    }
}

fn normalize_map(field: &FieldDescriptorProto, entry: &DescriptorProto, package: &str) -> Map {
    let entry_field = |number: i32| {
        entry
            .field
            .iter()
            .find(|f| f.number() == number)
            .map(|f| type_name(f, package))
            .unwrap_or_default()
    };

    Map {
        key_type: entry_field(1),
        field: Field {
            id: field.number(),
            name: field.name().to_string(),
            type_name: entry_field(2),
            is_repeated: false,
            options: Vec::new(),
        },
    }
}

/// The written form of a field type: scalars by keyword, messages and enums
/// by name relative to the file's package.
fn type_name(field: &FieldDescriptorProto, package: &str) -> String {
    // For primitive types, `type_name` is empty and `type` is set.
    if field.type_name().is_empty() {
        return format!("{:?}", field.type_())
            .to_lowercase()
            .replace("type_", "");
    }
    relative_name(field.type_name(), package)
}

fn relative_name(qualified: &str, package: &str) -> String {
    let name = qualified.trim_start_matches('.');
    if package.is_empty() {
        return name.to_string();
    }
    name.strip_prefix(package)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(name)
        .to_string()
}

/// Widest reserved range that is still expanded into individual IDs.
const MAX_EXPANDED_RANGE: i64 = 1024;

/// Records a reserved range: expanded into `ids` when narrow, kept whole in
/// `ranges` otherwise (`to max` always is).
fn add_reserved(span: ReservedRange, ids: &mut Vec<i32>, ranges: &mut Vec<ReservedRange>) {
    let width = i64::from(span.end) - i64::from(span.start) + 1;
    if width > MAX_EXPANDED_RANGE {
        ranges.push(span);
    } else {
        ids.extend(span.start..=span.end);
    }
}

fn normalize_enum(en: &EnumDescriptorProto, dotted_name: &str, annotations: &SourceAnnotations) -> Enum {
    let mut canonical_enum = Enum {
        name: dotted_name.to_string(),
        allow_alias: en.options.as_ref().map(|o| o.allow_alias()).unwrap_or(false),
        ..Default::default()
    };

    for value in en.value.iter() {
        canonical_enum.enum_fields.push(EnumField {
            name: value.name().to_string(),
            integer: value.number(),
            options: annotations.enum_value_options(dotted_name, value.name()),
        });
    }

    for range in en.reserved_range.iter() {
        // enum reserved ranges are end-inclusive
        let span = ReservedRange {
            start: range.start(),
            end: range.end(),
        };
        add_reserved(
            span,
            &mut canonical_enum.reserved_ids,
            &mut canonical_enum.reserved_ranges,
        );
    }
    canonical_enum.reserved_names = en.reserved_name.clone();

    canonical_enum
}

fn normalize_service(svc: &ServiceDescriptorProto, package: &str) -> Service {
    Service {
        name: svc.name().to_string(),
        rpcs: svc
            .method
            .iter()
            .map(|method| Rpc {
                name: method.name().to_string(),
                in_type: relative_name(method.input_type(), package),
                out_type: relative_name(method.output_type(), package),
                in_streamed: method.client_streaming(),
                out_streamed: method.server_streaming(),
            })
            .collect(),
    }
}

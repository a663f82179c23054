use protolock::canonical::ReservedRange;
use protolock::compat::reserved_rules;
use protolock::compat::{RuleConfig, RuleContext, Warning};
use protolock::{Protolock, compare, lock_from_source};

const SIMPLE_PROTO: &str = r#"
syntax = "proto3";
package test;

message Channel {
  int64 id = 1;
  string name = 2;
  string description = 3;
}

message NextRequest {}
message PreviousRequest {}

service ChannelChanger {
  rpc Next(stream NextRequest) returns (Channel);
  rpc Previous(PreviousRequest) returns (stream Channel);
}
"#;

const NO_USING_RESERVED_FIELDS_PROTO: &str = r#"
syntax = "proto3";
package test;

message Channel {
  reserved 4, 8 to 11;
  reserved "foo", "bar";
  int64 id = 1;
  string name = 2;
  string description = 3;
}

message NextRequest {}
message PreviousRequest {}

service ChannelChanger {
  rpc Next(stream NextRequest) returns (Channel);
  rpc Previous(PreviousRequest) returns (stream Channel);
}
"#;

const USING_RESERVED_FIELDS_PROTO: &str = r#"
syntax = "proto3";
package test;

message Channel {
  int64 id = 1;
  string name = 2;
  string description = 3;
  string foo = 4;
  bool bar = 5;
}

message NextRequest {}
message PreviousRequest {}

service ChannelChanger {
  rpc Next(stream NextRequest) returns (Channel);
  rpc Previous(PreviousRequest) returns (stream Channel);
}
"#;

const NO_REMOVE_RESERVED_FIELDS_PROTO: &str = r#"
syntax = "proto3";
package test;

message Channel {
  reserved 44, 101, 103 to 110;
  reserved "no_more", "goodbye";
  int64 id = 1;
  string name = 2;
  string description = 3;
  string foo = 4;
  bool bar = 5;
}
"#;

const REMOVE_RESERVED_FIELDS_PROTO: &str = r#"
syntax = "proto3";
package test;

message Channel {
  reserved 101, 103 to 107;
  reserved "no_more";
  int64 id = 1;
  string name = 2;
  string description = 3;
  string foo = 4;
  bool bar = 5;
}
"#;

fn parse_test_proto(proto: &str) -> Protolock {
    lock_from_source("test.proto", proto).expect("Failed to parse proto")
}

fn strict() -> RuleContext {
    RuleContext {
        strict: true,
        debug: true,
    }
}

fn check(old_proto: &str, new_proto: &str, strict: bool) -> Vec<Warning> {
    let current = parse_test_proto(old_proto);
    let updated = parse_test_proto(new_proto);
    compare(
        current,
        updated,
        RuleConfig {
            strict,
            debug: false,
        },
    )
    .warnings
}

fn by_rule<'a>(warnings: &'a [Warning], rule: &str) -> Vec<&'a Warning> {
    warnings.iter().filter(|w| w.rule_name == rule).collect()
}

#[test]
fn test_using_reserved_fields() {
    let current = parse_test_proto(NO_USING_RESERVED_FIELDS_PROTO);
    let updated = parse_test_proto(USING_RESERVED_FIELDS_PROTO);

    let result = reserved_rules::check_no_using_reserved_fields(&current, &updated, &strict());
    assert!(!result.is_ok());
    assert_eq!(result.warnings.len(), 3);

    let messages: Vec<&str> = result.warnings.iter().map(|w| w.message.as_str()).collect();
    assert!(messages.contains(&"\"Channel\" is re-using ID: 4, a reserved field"));
    assert!(messages.contains(&"\"Channel\" is re-using name: \"foo\", a reserved field"));
    assert!(messages.contains(&"\"Channel\" is re-using name: \"bar\", a reserved field"));
    assert!(result.warnings.iter().all(|w| w.filepath.as_str() == "test.proto"));
}

#[test]
fn test_removing_reserved_fields() {
    let current = parse_test_proto(NO_REMOVE_RESERVED_FIELDS_PROTO);
    let updated = parse_test_proto(REMOVE_RESERVED_FIELDS_PROTO);

    let result = reserved_rules::check_no_removing_reserved_fields(&current, &updated, &strict());
    assert!(!result.is_ok());
    assert_eq!(result.warnings.len(), 5);

    let messages: Vec<&str> = result.warnings.iter().map(|w| w.message.as_str()).collect();
    for id in [44, 108, 109, 110] {
        let expected = format!("\"Channel\" is missing ID: {id}, which had been reserved");
        assert!(messages.contains(&expected.as_str()), "missing warning for {id}");
    }
    assert!(messages.contains(&"\"Channel\" is missing name: \"goodbye\", which had been reserved"));
}

#[test]
fn test_removing_reserved_fields_is_strict_only() {
    let warnings = check(
        NO_REMOVE_RESERVED_FIELDS_PROTO,
        REMOVE_RESERVED_FIELDS_PROTO,
        false,
    );
    assert!(warnings.is_empty());
}

#[test]
fn test_unchanged_tree_has_no_warnings() {
    assert!(check(SIMPLE_PROTO, SIMPLE_PROTO, true).is_empty());
    assert!(check(NO_USING_RESERVED_FIELDS_PROTO, NO_USING_RESERVED_FIELDS_PROTO, true).is_empty());
}

#[test]
fn test_removing_field_without_reserve() {
    let new_proto = r#"
syntax = "proto3";
package test;

message Channel {
  int64 id = 1;
  string name = 2;
}

message NextRequest {}
message PreviousRequest {}

service ChannelChanger {
  rpc Next(stream NextRequest) returns (Channel);
  rpc Previous(PreviousRequest) returns (stream Channel);
}
"#;

    let warnings = check(SIMPLE_PROTO, new_proto, true);
    let removed = by_rule(&warnings, "NoRemovingFieldsWithoutReserve");
    assert_eq!(removed.len(), 2);
    assert_eq!(
        removed[0].message,
        "\"Channel\" ID: 3 has been removed, but is not reserved"
    );
    assert_eq!(
        removed[1].message,
        "\"Channel\" field: \"description\" has been removed, but is not reserved"
    );
}

#[test]
fn test_removing_field_with_reserve() {
    let new_proto = r#"
syntax = "proto3";
package test;

message Channel {
  reserved 3;
  reserved "description";
  int64 id = 1;
  string name = 2;
}

message NextRequest {}
message PreviousRequest {}

service ChannelChanger {
  rpc Next(stream NextRequest) returns (Channel);
  rpc Previous(PreviousRequest) returns (stream Channel);
}
"#;

    assert!(check(SIMPLE_PROTO, new_proto, true).is_empty());
}

#[test]
fn test_renaming_field() {
    let new_proto = r#"
syntax = "proto3";
package test;

message Channel {
  int64 id = 1;
  string name = 2;
  string summary = 3;
}

message NextRequest {}
message PreviousRequest {}

service ChannelChanger {
  rpc Next(stream NextRequest) returns (Channel);
  rpc Previous(PreviousRequest) returns (stream Channel);
}
"#;

    let warnings = check(SIMPLE_PROTO, new_proto, true);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].rule_name, "NoChangingFieldNames");
    assert_eq!(
        warnings[0].message,
        "\"Channel\" field: \"description\" ID: 3 has an updated name, \"summary\""
    );

    assert!(check(SIMPLE_PROTO, new_proto, false).is_empty());
}

#[test]
fn test_changing_field_id() {
    let new_proto = r#"
syntax = "proto3";
package test;

message Channel {
  int64 id = 1;
  string name = 4;
  string description = 3;
}

message NextRequest {}
message PreviousRequest {}

service ChannelChanger {
  rpc Next(stream NextRequest) returns (Channel);
  rpc Previous(PreviousRequest) returns (stream Channel);
}
"#;

    let warnings = check(SIMPLE_PROTO, new_proto, true);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].rule_name, "NoChangingFieldIDs");
    assert_eq!(
        warnings[0].message,
        "\"Channel\" field: \"name\" has a different ID: 4, previously 2"
    );
}

#[test]
fn test_changing_field_type_and_cardinality() {
    let new_proto = r#"
syntax = "proto3";
package test;

message Channel {
  string id = 1;
  repeated string name = 2;
  string description = 3;
}

message NextRequest {}
message PreviousRequest {}

service ChannelChanger {
  rpc Next(stream NextRequest) returns (Channel);
  rpc Previous(PreviousRequest) returns (stream Channel);
}
"#;

    let warnings = check(SIMPLE_PROTO, new_proto, true);
    let changed = by_rule(&warnings, "NoChangingFieldTypes");
    assert_eq!(warnings.len(), 2);
    assert_eq!(changed.len(), 2);
    assert!(changed.iter().any(|w| w.message
        == "\"Channel\" field: \"id\" has a different type: string, previously int64"));
    assert!(changed.iter().any(|w| w.message
        == "\"Channel\" field: \"name\" has changed repeated: repeated, previously singular"));
}

#[test]
fn test_changing_map_key_type() {
    let old_proto = r#"
syntax = "proto3";
package test;

message Counters {
  map<string, int32> counts = 1;
}
"#;
    let new_proto = r#"
syntax = "proto3";
package test;

message Counters {
  map<int64, int32> counts = 1;
}
"#;

    let warnings = check(old_proto, new_proto, true);
    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings[0].message,
        "\"Counters\" field: \"counts\" has a different map key type: int64, previously string"
    );
}

#[test]
fn test_changing_map_to_plain_field() {
    let old_proto = r#"
syntax = "proto3";
package test;

message Counters {
  map<string, int32> counts = 1;
}
"#;
    let new_proto = r#"
syntax = "proto3";
package test;

message Counters {
  int32 counts = 1;
}
"#;

    let warnings = check(old_proto, new_proto, true);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].rule_name, "NoChangingFieldTypes");
    assert_eq!(
        warnings[0].message,
        "\"Counters\" field: \"counts\" has a different type: int32, previously map<string, int32>"
    );
}

#[test]
fn test_removing_rpc() {
    let new_proto = r#"
syntax = "proto3";
package test;

message Channel {
  int64 id = 1;
  string name = 2;
  string description = 3;
}

message NextRequest {}
message PreviousRequest {}

service ChannelChanger {
  rpc Next(stream NextRequest) returns (Channel);
}
"#;

    let warnings = check(SIMPLE_PROTO, new_proto, true);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].rule_name, "NoRemovingRPCs");
    assert_eq!(
        warnings[0].message,
        "\"ChannelChanger\" is missing RPC: \"Previous\", which should be available"
    );

    assert!(check(SIMPLE_PROTO, new_proto, false).is_empty());
}

#[test]
fn test_removing_service_reports_each_rpc() {
    let new_proto = r#"
syntax = "proto3";
package test;

message Channel {
  int64 id = 1;
  string name = 2;
  string description = 3;
}

message NextRequest {}
message PreviousRequest {}
"#;

    let warnings = check(SIMPLE_PROTO, new_proto, true);
    assert_eq!(by_rule(&warnings, "NoRemovingRPCs").len(), 2);
}

#[test]
fn test_changing_rpc_signature() {
    let new_proto = r#"
syntax = "proto3";
package test;

message Channel {
  int64 id = 1;
  string name = 2;
  string description = 3;
}

message NextRequest {}
message PreviousRequest {}

service ChannelChanger {
  rpc Next(NextRequest) returns (stream Channel);
  rpc Previous(NextRequest) returns (stream Channel);
}
"#;

    let warnings = check(SIMPLE_PROTO, new_proto, true);
    let changed = by_rule(&warnings, "NoChangingRPCSignature");
    assert_eq!(warnings.len(), 3);
    assert_eq!(changed.len(), 3);
    assert_eq!(
        changed[0].message,
        "\"ChannelChanger\" RPC: \"Next\" has a different request streaming: \"unary\", previously \"streaming\""
    );
    assert_eq!(
        changed[1].message,
        "\"ChannelChanger\" RPC: \"Next\" has a different response streaming: \"streaming\", previously \"unary\""
    );
    assert_eq!(
        changed[2].message,
        "\"ChannelChanger\" RPC: \"Previous\" has a different request type: \"NextRequest\", previously \"PreviousRequest\""
    );
}

#[test]
fn test_nested_messages_are_compared_by_full_name() {
    let old_proto = r#"
syntax = "proto3";
package test;

message Parent1 {
  message Meta {
    string a = 1;
  }
  Meta meta = 1;
}

message Parent2 {
  message Meta {
    string a = 1;
  }
  Meta meta = 1;
}
"#;
    let new_proto = r#"
syntax = "proto3";
package test;

message Parent1 {
  message Meta {
    string a = 1;
  }
  Meta meta = 1;
}

message Parent2 {
  message Meta {
    int32 a = 1;
  }
  Meta meta = 1;
}
"#;

    let warnings = check(old_proto, new_proto, true);
    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings[0].message,
        "\"Parent2.Meta\" field: \"a\" has a different type: int32, previously string"
    );
}

#[test]
fn test_nested_message_field_types_are_package_relative() {
    let proto = r#"
syntax = "proto3";
package test;

message Parent1 {
  message Meta {
    string a = 1;
  }
  Meta meta = 1;
}
"#;
    let lock = parse_test_proto(proto);
    let field = &lock.definitions[0].def.messages[0].fields[0];
    assert_eq!(field.type_name, "Parent1.Meta");
}

#[test]
fn test_enum_value_removed_without_reserve() {
    let old_proto = r#"
syntax = "proto3";
package test;

enum Kind {
  KIND_UNSPECIFIED = 0;
  KIND_A = 1;
  KIND_B = 2;
}
"#;
    let new_proto = r#"
syntax = "proto3";
package test;

enum Kind {
  KIND_UNSPECIFIED = 0;
  KIND_A = 1;
}
"#;
    let reserved_proto = r#"
syntax = "proto3";
package test;

enum Kind {
  reserved 2;
  reserved "KIND_B";
  KIND_UNSPECIFIED = 0;
  KIND_A = 1;
}
"#;

    let warnings = check(old_proto, new_proto, true);
    assert_eq!(by_rule(&warnings, "NoRemovingFieldsWithoutReserve").len(), 2);
    assert!(warnings[0].message.starts_with("\"Kind\" ID: 2"));

    assert!(check(old_proto, reserved_proto, true).is_empty());
}

#[test]
fn test_enum_reserved_value_reused() {
    let old_proto = r#"
syntax = "proto3";
package test;

enum Kind {
  reserved 2 to 3;
  KIND_UNSPECIFIED = 0;
  KIND_A = 1;
}
"#;
    let new_proto = r#"
syntax = "proto3";
package test;

enum Kind {
  KIND_UNSPECIFIED = 0;
  KIND_A = 1;
  KIND_C = 3;
}
"#;

    let warnings = check(old_proto, new_proto, false);
    let reused = by_rule(&warnings, "NoUsingReservedFields");
    assert_eq!(reused.len(), 1);
    assert_eq!(reused[0].message, "\"Kind\" is re-using ID: 3, a reserved field");
}

#[test]
fn test_nested_reserved_ids_are_kept_per_parent() {
    let old_proto = r#"
syntax = "proto3";
package test;

message Parent1 {
  message Meta {
    reserved 2;
    string a = 1;
  }
  Meta meta = 1;
}

message Parent2 {
  message Meta {
    string a = 1;
    string b = 2;
  }
  Meta meta = 1;
}
"#;
    let new_proto = r#"
syntax = "proto3";
package test;

message Parent1 {
  message Meta {
    string a = 1;
    string c = 2;
  }
  Meta meta = 1;
}

message Parent2 {
  message Meta {
    string a = 1;
    string b = 2;
  }
  Meta meta = 1;
}
"#;

    let current = parse_test_proto(old_proto);
    let updated = parse_test_proto(new_proto);
    let result = reserved_rules::check_no_using_reserved_fields(&current, &updated, &strict());
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(
        result.warnings[0].message,
        "\"Parent1.Meta\" is re-using ID: 2, a reserved field"
    );
}

const RESERVED_TO_MAX_PROTO: &str = r#"
syntax = "proto3";
package test;

message Channel {
  reserved 100 to max;
  int64 id = 1;
}

enum Kind {
  reserved 100 to max;
  KIND_UNSPECIFIED = 0;
}
"#;

#[test]
fn test_reserved_to_max_is_kept_as_a_range() {
    let lock = parse_test_proto(RESERVED_TO_MAX_PROTO);
    let entry = &lock.definitions[0].def;

    let channel = &entry.messages[0];
    assert!(channel.reserved_ids.is_empty());
    assert_eq!(
        channel.reserved_ranges,
        vec![ReservedRange { start: 100, end: 536_870_911 }]
    );
    let kind = &entry.enums[0];
    assert!(kind.reserved_ids.is_empty());
    assert_eq!(
        kind.reserved_ranges,
        vec![ReservedRange { start: 100, end: i32::MAX }]
    );

    assert!(check(RESERVED_TO_MAX_PROTO, RESERVED_TO_MAX_PROTO, true).is_empty());
}

#[test]
fn test_reusing_and_removing_reserved_to_max() {
    let reused_proto = r#"
syntax = "proto3";
package test;

message Channel {
  int64 id = 1;
  int64 legacy = 150;
}

enum Kind {
  KIND_UNSPECIFIED = 0;
  KIND_LEGACY = 150;
}
"#;

    let warnings = check(RESERVED_TO_MAX_PROTO, reused_proto, true);
    let reused: Vec<&str> = by_rule(&warnings, "NoUsingReservedFields")
        .iter()
        .map(|w| w.message.as_str())
        .collect();
    assert_eq!(
        reused,
        vec![
            "\"Channel\" is re-using ID: 150, a reserved field",
            "\"Kind\" is re-using ID: 150, a reserved field",
        ]
    );

    let removed: Vec<&str> = by_rule(&warnings, "NoRemovingReservedFields")
        .iter()
        .map(|w| w.message.as_str())
        .collect();
    assert_eq!(
        removed,
        vec![
            "\"Channel\" is missing IDs: 100 to 536870911, which had been reserved",
            "\"Kind\" is missing IDs: 100 to 2147483647, which had been reserved",
        ]
    );
}

#[test]
fn test_widening_a_reservation_to_max_keeps_it() {
    let old_proto = r#"
syntax = "proto3";
package test;

message Channel {
  reserved 100 to 200;
  int64 id = 1;
  string name = 2;
}
"#;
    let new_proto = r#"
syntax = "proto3";
package test;

message Channel {
  reserved 2, 100 to max;
  reserved "name";
  int64 id = 1;
}
"#;

    assert!(check(old_proto, new_proto, true).is_empty());
}

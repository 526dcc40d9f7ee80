//! Comprehensive test suite for enumcheck-core.
//!
//! Each scenario assembles real bytecode through the constant pool and drives
//! [`analyze_class`] end to end, mirroring how javac compiles the equivalent
//! Java source.

use crate::detect::analyze_class;
use crate::testutil::{test_index, ClassBuilder, MethodAsm};

const SIG_PUT: &str = "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/lang/Object;";
const SIG_ADD: &str = "(Ljava/lang/Object;)Z";
const HOLDER: &str = "com/example/Holder";

fn hash_map_ctor(m: &mut MethodAsm) {
    m.new_("java/util/HashMap");
    m.dup();
    m.invokespecial("java/util/HashMap", "<init>", "()V");
}

fn map_put(m: &mut MethodAsm) {
    m.invokeinterface("java/util/Map", "put", SIG_PUT);
}

fn set_add(m: &mut MethodAsm) {
    m.invokeinterface("java/util/Set", "add", SIG_ADD);
}

// Core Test 1: HashMap constructed locally, put with an enum key
#[test]
fn test_local_hashmap_put_is_flagged_once() {
    // void render(Color c) { Map m = new HashMap(); m.put(c, "x"); }
    let class = ClassBuilder::new(HOLDER)
        .method("render", "(Lcom/example/Color;)V", |m| {
            hash_map_ctor(m);
            m.astore(2);
            m.aload(2);
            m.aload(1);
            m.ldc_string("x");
            m.line(42);
            map_put(m);
            m.pop();
            m.vreturn();
        })
        .finish();

    let analysis = analyze_class(&class, &test_index());
    assert_eq!(analysis.findings.len(), 1);
    let finding = &analysis.findings[0];
    assert_eq!(finding.class_name, HOLDER);
    assert_eq!(finding.method_name, "render");
    assert_eq!(finding.line, Some(42));
    assert!(analysis.missing_classes.is_empty());
}

// Core Test 2: HashSet constructed locally, add with an enum key
#[test]
fn test_local_hashset_add_is_flagged() {
    let class = ClassBuilder::new(HOLDER)
        .method("mark", "(Lcom/example/Color;)V", |m| {
            m.new_("java/util/HashSet");
            m.dup();
            m.invokespecial("java/util/HashSet", "<init>", "()V");
            m.astore(2);
            m.aload(2);
            m.aload(1);
            set_add(m);
            m.pop();
            m.vreturn();
        })
        .finish();

    let analysis = analyze_class(&class, &test_index());
    assert_eq!(analysis.findings.len(), 1);
}

// Core Test 3: enum-specialized collections are never flagged
#[test]
fn test_enum_map_and_enum_set_are_clean() {
    let class = ClassBuilder::new(HOLDER)
        .method("viaEnumMap", "(Lcom/example/Color;)V", |m| {
            m.new_("java/util/EnumMap");
            m.dup();
            m.ldc_class("com/example/Color");
            m.invokespecial("java/util/EnumMap", "<init>", "(Ljava/lang/Class;)V");
            m.astore(2);
            m.aload(2);
            m.aload(1);
            m.aconst_null();
            map_put(m);
            m.pop();
            m.vreturn();
        })
        .method("viaEnumSet", "(Lcom/example/Color;)V", |m| {
            m.ldc_class("com/example/Color");
            m.invokestatic(
                "java/util/EnumSet",
                "noneOf",
                "(Ljava/lang/Class;)Ljava/util/EnumSet;",
            );
            m.astore(2);
            m.aload(2);
            m.aload(1);
            set_add(m);
            m.pop();
            m.vreturn();
        })
        .finish();

    let analysis = analyze_class(&class, &test_index());
    assert!(analysis.findings.is_empty());
}

// Core Test 4: Guava factories tag like the constructors do
#[test]
fn test_guava_factories() {
    let flagged = ClassBuilder::new(HOLDER)
        .method("viaNewHashMap", "(Lcom/example/Color;)V", |m| {
            m.invokestatic(
                "com/google/common/collect/Maps",
                "newHashMap",
                "()Ljava/util/HashMap;",
            );
            m.astore(2);
            m.aload(2);
            m.aload(1);
            m.aconst_null();
            map_put(m);
            m.pop();
            m.vreturn();
        })
        .finish();
    assert_eq!(analyze_class(&flagged, &test_index()).findings.len(), 1);

    let clean = ClassBuilder::new(HOLDER)
        .method("viaNewEnumMap", "(Lcom/example/Color;)V", |m| {
            m.ldc_class("com/example/Color");
            m.invokestatic(
                "com/google/common/collect/Maps",
                "newEnumMap",
                "(Ljava/lang/Class;)Ljava/util/EnumMap;",
            );
            m.astore(2);
            m.aload(2);
            m.aload(1);
            m.aconst_null();
            map_put(m);
            m.pop();
            m.vreturn();
        })
        .finish();
    assert!(analyze_class(&clean, &test_index()).findings.is_empty());
}

// Core Test 5: an enum implementing an interface is excluded
#[test]
fn test_interface_enum_key_is_clean() {
    let class = ClassBuilder::new(HOLDER)
        .method("render", "(Lcom/example/Labeled;)V", |m| {
            hash_map_ctor(m);
            m.astore(2);
            m.aload(2);
            m.aload(1);
            m.aconst_null();
            map_put(m);
            m.pop();
            m.vreturn();
        })
        .finish();

    assert!(analyze_class(&class, &test_index()).findings.is_empty());
}

// Core Test 6: non-enum keys are excluded
#[test]
fn test_plain_class_key_is_clean() {
    let class = ClassBuilder::new(HOLDER)
        .method("render", "(Lcom/example/Plain;)V", |m| {
            hash_map_ctor(m);
            m.astore(2);
            m.aload(2);
            m.aload(1);
            m.aconst_null();
            map_put(m);
            m.pop();
            m.vreturn();
        })
        .finish();

    assert!(analyze_class(&class, &test_index()).findings.is_empty());
}

// Core Test 7: unresolvable key types are reported missing, not flagged
#[test]
fn test_missing_key_class_is_recorded() {
    let class = ClassBuilder::new(HOLDER)
        .method("render", "(Lcom/example/Ghost;)V", |m| {
            hash_map_ctor(m);
            m.astore(2);
            m.aload(2);
            m.aload(1);
            m.aconst_null();
            map_put(m);
            m.pop();
            m.vreturn();
        })
        .finish();

    let analysis = analyze_class(&class, &test_index());
    assert!(analysis.findings.is_empty());
    assert_eq!(analysis.missing_classes, vec!["com/example/Ghost".to_string()]);
}

// Core Test 8: classes below the generics-era format version are skipped
#[test]
fn test_version_gate() {
    fn blatant(m: &mut MethodAsm) {
        hash_map_ctor(m);
        m.astore(2);
        m.aload(2);
        m.aload(1);
        m.aconst_null();
        map_put(m);
        m.pop();
        m.vreturn();
    }

    let old = ClassBuilder::new(HOLDER)
        .major(48)
        .method("render", "(Lcom/example/Color;)V", blatant)
        .finish();
    assert!(analyze_class(&old, &test_index()).findings.is_empty());

    let boundary = ClassBuilder::new(HOLDER)
        .major(49)
        .method("render", "(Lcom/example/Color;)V", blatant)
        .finish();
    assert_eq!(analyze_class(&boundary, &test_index()).findings.len(), 1);
}

// Core Test 9: storing an untagged value erases a slot's tag
#[test]
fn test_untagged_store_erases_slot_tag() {
    // Map m = new HashMap(); m = null; m.put(c, null);
    let class = ClassBuilder::new(HOLDER)
        .method("render", "(Lcom/example/Color;)V", |m| {
            hash_map_ctor(m);
            m.astore(2);
            m.aconst_null();
            m.astore(2);
            m.aload(2);
            m.aload(1);
            m.aconst_null();
            map_put(m);
            m.pop();
            m.vreturn();
        })
        .finish();

    assert!(analyze_class(&class, &test_index()).findings.is_empty());
}

// Core Test 10: untagged receivers fall back to the declared signature
#[test]
fn test_signature_fallback_for_parameters() {
    // A parameter declared as HashMap is flaggable without any tag
    let concrete = ClassBuilder::new(HOLDER)
        .method("fill", "(Lcom/example/Color;Ljava/util/HashMap;)V", |m| {
            m.aload(2);
            m.aload(1);
            m.aconst_null();
            map_put(m);
            m.pop();
            m.vreturn();
        })
        .finish();
    assert_eq!(analyze_class(&concrete, &test_index()).findings.len(), 1);

    // Declared as the Map interface, nothing is known about the receiver
    let abstract_ = ClassBuilder::new(HOLDER)
        .method("fill", "(Lcom/example/Color;Ljava/util/Map;)V", |m| {
            m.aload(2);
            m.aload(1);
            m.aconst_null();
            map_put(m);
            m.pop();
            m.vreturn();
        })
        .finish();
    assert!(analyze_class(&abstract_, &test_index()).findings.is_empty());
}

// Core Test 11: field tags persist from the constructor to other methods
#[test]
fn test_field_tag_persists_across_methods() {
    let class = ClassBuilder::new(HOLDER)
        .field("lookup", "Ljava/util/Map;")
        .method("<init>", "()V", |m| {
            m.aload(0);
            hash_map_ctor(m);
            m.putfield(HOLDER, "lookup", "Ljava/util/Map;");
            m.vreturn();
        })
        .method("store", "(Lcom/example/Color;)V", |m| {
            m.aload(0);
            m.getfield(HOLDER, "lookup", "Ljava/util/Map;");
            m.aload(1);
            m.aconst_null();
            map_put(m);
            m.pop();
            m.vreturn();
        })
        .finish();

    let analysis = analyze_class(&class, &test_index());
    assert_eq!(analysis.findings.len(), 1);
    assert_eq!(analysis.findings[0].method_name, "store");
}

// Core Test 12: one finding per backing field across the whole class,
// even through a local alias
#[test]
fn test_field_reported_once_per_class() {
    let class = ClassBuilder::new(HOLDER)
        .field("lookup", "Ljava/util/Map;")
        .method("<init>", "()V", |m| {
            m.aload(0);
            hash_map_ctor(m);
            m.putfield(HOLDER, "lookup", "Ljava/util/Map;");
            m.vreturn();
        })
        .method("storeFirst", "(Lcom/example/Color;)V", |m| {
            m.aload(0);
            m.getfield(HOLDER, "lookup", "Ljava/util/Map;");
            m.aload(1);
            m.aconst_null();
            map_put(m);
            m.pop();
            m.vreturn();
        })
        .method("storeAgain", "(Lcom/example/Color;)V", |m| {
            // Same field through a local alias; still suppressed
            m.aload(0);
            m.getfield(HOLDER, "lookup", "Ljava/util/Map;");
            m.astore(2);
            m.aload(2);
            m.aload(1);
            m.aconst_null();
            map_put(m);
            m.pop();
            m.vreturn();
        })
        .finish();

    let analysis = analyze_class(&class, &test_index());
    assert_eq!(analysis.findings.len(), 1);
    assert_eq!(analysis.findings[0].method_name, "storeFirst");
}

// Core Test 13: a finding hard-stops the method; a second genuine site in
// the same method is not reported
#[test]
fn test_method_scan_stops_after_first_finding() {
    let class = ClassBuilder::new(HOLDER)
        .method("render", "(Lcom/example/Color;)V", |m| {
            hash_map_ctor(m);
            m.astore(2);
            m.aload(2);
            m.aload(1);
            m.aconst_null();
            m.line(10);
            map_put(m);
            m.pop();

            hash_map_ctor(m);
            m.astore(3);
            m.aload(3);
            m.aload(1);
            m.aconst_null();
            m.line(20);
            map_put(m);
            m.pop();
            m.vreturn();
        })
        .finish();

    let analysis = analyze_class(&class, &test_index());
    assert_eq!(analysis.findings.len(), 1);
    assert_eq!(analysis.findings[0].line, Some(10));
}

// Core Test 14: local receivers do not suppress across methods
#[test]
fn test_local_receivers_flag_in_every_method() {
    fn body(m: &mut MethodAsm) {
        hash_map_ctor(m);
        m.astore(2);
        m.aload(2);
        m.aload(1);
        m.aconst_null();
        map_put(m);
        m.pop();
        m.vreturn();
    }
    let class = ClassBuilder::new(HOLDER)
        .method("first", "(Lcom/example/Color;)V", body)
        .method("second", "(Lcom/example/Color;)V", body)
        .finish();

    // Each method has its own local receiver; both are reported
    assert_eq!(analyze_class(&class, &test_index()).findings.len(), 2);
}

// Core Test 15: ternary construction merges without corrupting the stack
#[test]
fn test_ternary_both_branches_hash_map() {
    // Map m = flag ? new HashMap() : new HashMap(); m.put(c, null);
    let class = ClassBuilder::new(HOLDER)
        .method("render", "(Lcom/example/Color;)V", |m| {
            m.iconst_0(); // offset 0
            m.ifeq(13); // 1 -> else branch at 14
            m.new_("java/util/HashMap"); // 4
            m.dup(); // 7
            m.invokespecial("java/util/HashMap", "<init>", "()V"); // 8
            m.goto(10); // 11 -> merge at 21
            m.new_("java/util/HashMap"); // 14
            m.dup(); // 17
            m.invokespecial("java/util/HashMap", "<init>", "()V"); // 18
            m.astore(2); // 21 (merge point)
            m.aload(2);
            m.aload(1);
            m.aconst_null();
            map_put(m);
            m.pop();
            m.vreturn();
        })
        .finish();

    assert_eq!(analyze_class(&class, &test_index()).findings.len(), 1);
}

#[test]
fn test_ternary_mixed_branches_take_fall_through_tag() {
    // Map m = flag ? new HashMap() : new TreeMap(); the fall-through branch
    // (TreeMap, tagged special) decides, so nothing is flagged
    let class = ClassBuilder::new(HOLDER)
        .method("render", "(Lcom/example/Color;)V", |m| {
            m.iconst_0();
            m.ifeq(13);
            m.new_("java/util/HashMap");
            m.dup();
            m.invokespecial("java/util/HashMap", "<init>", "()V");
            m.goto(10);
            m.new_("java/util/TreeMap");
            m.dup();
            m.invokespecial("java/util/TreeMap", "<init>", "()V");
            m.astore(2);
            m.aload(2);
            m.aload(1);
            m.aconst_null();
            map_put(m);
            m.pop();
            m.vreturn();
        })
        .finish();

    assert!(analyze_class(&class, &test_index()).findings.is_empty());
}

// Core Test 16: other java.util constructors tag as special, not flaggable
#[test]
fn test_special_collections_are_clean() {
    let class = ClassBuilder::new(HOLDER)
        .method("viaTree", "(Lcom/example/Color;)V", |m| {
            m.new_("java/util/TreeMap");
            m.dup();
            m.invokespecial("java/util/TreeMap", "<init>", "()V");
            m.astore(2);
            m.aload(2);
            m.aload(1);
            m.aconst_null();
            map_put(m);
            m.pop();
            m.vreturn();
        })
        .method("viaLinked", "(Lcom/example/Color;)V", |m| {
            m.new_("java/util/LinkedHashSet");
            m.dup();
            m.invokespecial("java/util/LinkedHashSet", "<init>", "()V");
            m.astore(2);
            m.aload(2);
            m.aload(1);
            set_add(m);
            m.pop();
            m.vreturn();
        })
        .finish();

    assert!(analyze_class(&class, &test_index()).findings.is_empty());
}

// Core Test 17: calls with other names or descriptors are not judged
#[test]
fn test_unrelated_interface_calls_are_ignored() {
    let class = ClassBuilder::new(HOLDER)
        .method("render", "(Lcom/example/Color;)V", |m| {
            hash_map_ctor(m);
            m.astore(2);
            m.aload(2);
            m.aload(1);
            m.invokeinterface("java/util/Map", "containsKey", "(Ljava/lang/Object;)Z");
            m.pop();
            m.vreturn();
        })
        .finish();

    assert!(analyze_class(&class, &test_index()).findings.is_empty());
}

// Core Test 18: methods without line tables still report, with no line
#[test]
fn test_finding_without_line_table() {
    let class = ClassBuilder::new(HOLDER)
        .method("render", "(Lcom/example/Color;)V", |m| {
            hash_map_ctor(m);
            m.astore(2);
            m.aload(2);
            m.aload(1);
            m.aconst_null();
            map_put(m);
            m.pop();
            m.vreturn();
        })
        .finish();

    let analysis = analyze_class(&class, &test_index());
    assert_eq!(analysis.findings.len(), 1);
    assert_eq!(analysis.findings[0].line, None);
}

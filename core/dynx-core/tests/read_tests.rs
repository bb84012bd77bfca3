// Read path integration tests
//
// 범위(start/limit), 필터 폴딩, 해시 필터, 다중 컬럼/맵 조회, 오류 케이스

use dynx_core::{Database, DatabaseConfig, DynxError, MemoryEngine, Scan, values};

// ─── Helpers ────────────────────────────────────────────

fn open(engine: &MemoryEngine) -> Database {
    let config = DatabaseConfig::new("test")
        .with_data_pool_size(4)
        .with_sql_pool_size(2);
    Database::open(config, engine).unwrap()
}

fn numbers(range: std::ops::Range<i32>) -> Vec<String> {
    range.map(|i| i.to_string()).collect()
}

// ═══════════════════════════════════════════════════════════
// Ranges and filters
// ═══════════════════════════════════════════════════════════

#[test]
fn test_get_ranged_col() {
    let engine = MemoryEngine::new();
    let db = open(&engine);
    for n in 0..10 {
        let foo = if n % 2 == 0 { "bar" } else { "baz" };
        db.insert("ranged", "n", n, "foo", &values![foo]).unwrap();
    }

    let col = db.get_col("ranged", "n", &Scan::all().limit(5)).unwrap();
    assert_eq!(col, numbers(0..5));

    let col = db.get_col("ranged", "n", &Scan::all().start(3).limit(5)).unwrap();
    assert_eq!(col, numbers(3..8));

    // start/limit는 필터 이후에 적용
    let col = db
        .get_col("ranged", "n", &Scan::all().filter("foo=bar").start(1).limit(3))
        .unwrap();
    assert_eq!(col, vec!["2", "4", "6"]);

    // limit 0 = 제한 없음
    let col = db.get_col("ranged", "n", &Scan::all().start(8)).unwrap();
    assert_eq!(col, numbers(8..10));
}

#[test]
fn test_get_filtered_col() {
    let engine = MemoryEngine::new();
    let db = open(&engine);
    for tid in 0..100 {
        db.insert("thread", "tid", tid, "collect", &values![tid % 2]).unwrap();
    }

    let col = db
        .get_col("thread", "tid", &Scan::all().filters(["tid>50", "collect=0"]))
        .unwrap();
    let expected: Vec<String> = (52..100).step_by(2).map(|i| i.to_string()).collect();
    assert_eq!(col, expected);
}

#[test]
fn test_folded_and_residual_filters_agree() {
    let engine = MemoryEngine::new();
    let db = open(&engine);
    for n in 0..20 {
        // m mirrors n, so a filter on m is always residual
        db.insert("mirror", "n", n, "m", &values![n]).unwrap();
    }

    for (folded, residual) in [
        ("n>=5", "m>=5"),
        ("n>15", "m>15"),
        ("n<3", "m<3"),
        ("n<=4", "m<=4"),
        ("n=7", "m=7"),
        ("n!=7", "m!=7"),
    ] {
        let a = db.get_col("mirror", "n", &Scan::all().filter(folded)).unwrap();
        let b = db.get_col("mirror", "n", &Scan::all().filter(residual)).unwrap();
        assert_eq!(a, b, "{folded} vs {residual}");
    }

    let a = db
        .get_col("mirror", "n", &Scan::all().filter("n>=5").start(2).limit(3))
        .unwrap();
    assert_eq!(a, numbers(7..10));
}

#[test]
fn test_text_field_filter() {
    let engine = MemoryEngine::new();
    let db = open(&engine);
    for (i, c2) in ["foo", "bar", "foo", "baz", "foo", "foo"].iter().enumerate() {
        db.insert("text_filter", "c1", i as i32, "c2", &values![*c2]).unwrap();
    }

    let col = db
        .get_col("text_filter", "c1", &Scan::all().filter("c2=foo"))
        .unwrap();
    assert_eq!(col, vec!["0", "2", "4", "5"]);
    // 필터가 해시 컬럼을 만들고 backfill
    assert!(db.schema("text_filter").has_column("hash_c2"));

    let col = db
        .get_col("text_filter", "c1", &Scan::all().filter("c2!=foo"))
        .unwrap();
    assert_eq!(col, vec!["1", "3"]);
}

#[test]
fn test_ordering_filter_on_long_string_rejected() {
    let engine = MemoryEngine::new();
    let db = open(&engine);
    db.insert("thread", "tid", 1, "subject", &values!["hello"]).unwrap();
    let ddl = engine.ddl_count();

    let err = db
        .get_col("thread", "tid", &Scan::all().filter("subject>foo"))
        .unwrap_err();
    assert!(matches!(err, DynxError::InvalidFilter { .. }));
    assert_eq!(engine.ddl_count(), ddl);
}

#[test]
fn test_text_leading_column_scan() {
    let engine = MemoryEngine::new();
    let db = open(&engine);
    for name in ["carol", "alice", "bob"] {
        db.insert("users", "name", name, "age", &values![name.len() as i32]).unwrap();
    }

    // 해시 순서로 반환되므로 정렬 후 비교
    let mut names = db.get_col("users", "name", &Scan::all()).unwrap();
    names.sort();
    assert_eq!(names, vec!["alice", "bob", "carol"]);

    let map = db
        .get_map("users", "name, age", &Scan::all().filter("name=bob"))
        .unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(map["bob"], "3");
}

// ═══════════════════════════════════════════════════════════
// Multi-column reads
// ═══════════════════════════════════════════════════════════

#[test]
fn test_get_multi_col() {
    let engine = MemoryEngine::new();
    let db = open(&engine);
    for i in 0..10 {
        db.insert("multi", "c1", i, "c2, p", &values![i * 10, format!("P{}", i % 3)])
            .unwrap();
    }

    let rows = db.get_multi_col("multi", "c1, c2", &Scan::all()).unwrap();
    assert_eq!(rows.len(), 10);
    assert_eq!(rows[4], vec!["4", "40"]);

    let rows = db
        .get_multi_col("multi", "c1, c2", &Scan::all().filter("c1=2"))
        .unwrap();
    assert_eq!(rows, vec![vec!["2".to_string(), "20".to_string()]]);

    let rows = db
        .get_multi_col("multi", "c1, c2", &Scan::all().start(3).limit(5))
        .unwrap();
    let firsts: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(firsts, vec!["3", "4", "5", "6", "7"]);

    let rows = db
        .get_multi_col("multi", "c1, c2", &Scan::all().filter("p=P2").start(1).limit(2))
        .unwrap();
    let firsts: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(firsts, vec!["5", "8"]);
}

#[test]
fn test_composite_index_reads() {
    let engine = MemoryEngine::new();
    let db = open(&engine);
    for id in 1..=10 {
        db.insert("mulindex", "id, time", (id, 1000), "price", &values![id * 2]).unwrap();
        db.insert("mulindex", "id, time", (id, 2000), "price", &values![id * 3]).unwrap();
        db.insert("mulindex", "id, time", (id, 3000), "price", &values![id * 4]).unwrap();
    }

    let rows = db
        .get_multi_col("mulindex", "id$time, id, time", &Scan::all())
        .unwrap();
    assert_eq!(rows.len(), 30);
    assert_eq!(rows[0], vec!["1", "1000"]);
    assert_eq!(rows[4], vec!["2", "2000"]);

    let times = db
        .get_col("mulindex", "id$time, time", &Scan::all().filter("id=3"))
        .unwrap();
    assert_eq!(times, vec!["1000", "2000", "3000"]);

    let rows = db
        .get_multi_col("mulindex", "id$time, time, price", &Scan::all().filter("id=2"))
        .unwrap();
    assert_eq!(rows[1], vec!["2000", "6"]);

    let map = db
        .get_map("mulindex", "id$time, time, price", &Scan::all().filter("id=3"))
        .unwrap();
    assert_eq!(map["3000"], "12");
}

// ═══════════════════════════════════════════════════════════
// Maps
// ═══════════════════════════════════════════════════════════

#[test]
fn test_get_ranged_map() {
    let engine = MemoryEngine::new();
    let db = open(&engine);
    for i in 0..10 {
        db.insert("ranged_map", "i", i, "s", &values!["OK".repeat(i as usize)]).unwrap();
    }

    let map = db
        .get_map("ranged_map", "i, s", &Scan::all().start(1).limit(7))
        .unwrap();
    assert_eq!(map.len(), 7);
    for i in 1..8 {
        assert_eq!(map[&i.to_string()], "OK".repeat(i));
    }

    for i in 30..40 {
        db.insert("ranged_map", "i", i, "s, p", &values!["FOO".repeat(i as usize), "FOO"])
            .unwrap();
    }
    let map = db
        .get_map("ranged_map", "i, s", &Scan::all().filter("p=FOO").start(3).limit(5))
        .unwrap();
    let mut keys: Vec<i32> = map.keys().map(|k| k.parse().unwrap()).collect();
    keys.sort();
    assert_eq!(keys, (33..38).collect::<Vec<_>>());
}

#[test]
fn test_get_multi_map() {
    let engine = MemoryEngine::new();
    let db = open(&engine);
    for i in 0..5 {
        let (a, b) = ("A".repeat(i + 2), "B".repeat(i + 2));
        db.insert("multi_map", "k", i as i32, "a, b", &values![a, b]).unwrap();
    }
    db.insert("multi_map", "k", 10, "a, b", &values!["AAA", "XYZ"]).unwrap();

    let map = db.get_multi_map("multi_map", "k, a, b", &Scan::all()).unwrap();
    assert_eq!(map.len(), 6);
    assert_eq!(map["2"], vec!["AAAA".to_string(), "BBBB".to_string()]);

    let map = db
        .get_multi_map("multi_map", "k, a, b", &Scan::all().filter("a=AAA"))
        .unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map["1"], vec!["AAA".to_string(), "BBB".to_string()]);
    assert_eq!(map["10"], vec!["AAA".to_string(), "XYZ".to_string()]);
}

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

#[test]
fn test_read_never_creates_structure() {
    let engine = MemoryEngine::new();
    let db = open(&engine);

    let err = db.get_col("missing", "id", &Scan::all()).unwrap_err();
    assert!(matches!(err, DynxError::TableNotFound(ref t) if t == "missing"));
    assert!(!engine.has_table("missing"));

    db.insert("thread", "tid", 1, "", &[]).unwrap();
    let ddl = engine.ddl_count();
    let err = db.get_col("thread", "nope", &Scan::all()).unwrap_err();
    assert!(matches!(err, DynxError::ColumnNotFound { ref column, .. } if column == "nope"));
    let err = db
        .get_col("thread", "tid", &Scan::all().filter("nope=1"))
        .unwrap_err();
    assert!(matches!(err, DynxError::ColumnNotFound { .. }));
    assert_eq!(engine.ddl_count(), ddl);
}

#[test]
fn test_read_sees_table_created_elsewhere() {
    let engine = MemoryEngine::new();
    let db = open(&engine);

    // 다른 프로세스가 만든 테이블: 캐시 miss → reload
    let other = open(&engine);
    other.insert("shared", "id", 1, "v", &values![7]).unwrap();

    let map = db.get_map("shared", "id, v", &Scan::all()).unwrap();
    assert_eq!(map["1"], "7");
}

#[test]
fn test_malformed_filter() {
    let engine = MemoryEngine::new();
    let db = open(&engine);
    db.insert("thread", "tid", 1, "", &[]).unwrap();

    for expr in ["tid~5", "=5", "tid", ""] {
        let err = db
            .get_col("thread", "tid", &Scan::all().filter(expr))
            .unwrap_err();
        assert!(matches!(err, DynxError::InvalidFilter { .. }), "{expr}");
    }
}

#[test]
fn test_map_needs_two_fields() {
    let engine = MemoryEngine::new();
    let db = open(&engine);
    db.insert("thread", "tid", 1, "", &[]).unwrap();

    let err = db.get_map("thread", "tid", &Scan::all()).unwrap_err();
    assert!(matches!(err, DynxError::InvalidArguments(_)));
    let err = db.get_multi_map("thread", "tid", &Scan::all()).unwrap_err();
    assert!(matches!(err, DynxError::InvalidArguments(_)));
}

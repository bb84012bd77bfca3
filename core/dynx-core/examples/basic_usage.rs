//! 기본 사용 예제: 스키마 자동 생성, upsert, 배치, 조회
//!
//! 실행: cargo run --example basic_usage

use dynx_core::{Database, Scan, values};

fn main() -> dynx_core::DynxResult<()> {
    println!("=== DYNX 기본 사용 예제 ===\n");

    // 1. 인메모리 데이터베이스 생성
    println!("1. 데이터베이스 생성...");
    let db = Database::open_in_memory()?;
    println!("   ✓ 인메모리 엔진에 연결 완료\n");

    // 2. 삽입 (테이블, 컬럼, 인덱스는 처음 쓸 때 만들어짐)
    println!("2. 데이터 삽입...");
    db.insert("users", "name", "alice", "age, city", &values![30, "Seoul"])?;
    db.insert("users", "name", "bob", "age, city", &values![25, "Busan"])?;
    db.insert("users", "name", "carol", "age, city", &values![41, "Seoul"])?;
    let schema = db.schema("users");
    let mut columns: Vec<_> = schema.columns.keys().cloned().collect();
    columns.sort();
    println!("   ✓ 컬럼: {}", columns.join(", "));
    println!("   ✓ 인덱스: hash_name = {}\n", schema.has_index("hash_name"));

    // 3. 중복 키
    println!("3. 중복 삽입...");
    match db.insert("users", "name", "alice", "age", &values![99]) {
        Err(err) if err.is_duplicate_key() => println!("   ✓ 거부됨: {err}\n"),
        other => println!("   예상과 다름: {other:?}\n"),
    }

    // 4. 갱신 / upsert
    println!("4. 데이터 수정...");
    let count = db.update("users", "name", "bob", "age", &values![26])?;
    println!("   bob: matched={} changed={}", count.matched, count.changed);
    db.update_insert("users", "name", "dave", "age, city", &values![35, "Incheon"])?;
    println!("   ✓ dave upsert 완료\n");

    // 5. 조회: 해시 필터와 범위
    println!("5. 데이터 조회...");
    let seoul = db.get_map("users", "name, age", &Scan::all().filter("city=Seoul"))?;
    for (name, age) in &seoul {
        println!("   {name} ({age}) lives in Seoul");
    }
    let adults = db.get_multi_map("users", "name, age, city", &Scan::all().filter("age>=30"))?;
    println!("   age>=30: {} rows\n", adults.len());

    // 6. 배치 커서는 한 번의 왕복으로 전송
    println!("6. 배치 쓰기...");
    let mut batch = db.batch();
    for day in 1..=5 {
        batch.insert(
            "price",
            "itemid, time",
            (1, 20240100 + day),
            "price",
            &values![9.5 + f64::from(day)],
        )?;
    }
    let results = batch.commit()?;
    let failed = results.iter().filter(|r| !r.is_ok()).count();
    println!("   ✓ {}개 연산, 오류 {}개", results.len(), failed);

    let scan = Scan::all().filter("itemid=1").limit(3);
    let prices = db.get_col("price", "itemid$time, price", &scan)?;
    println!("   첫 3개 가격: {}\n", prices.join(", "));

    // 7. 풀 통계
    println!("7. 커넥션 풀...");
    let stats = db.data_pool_stats();
    println!(
        "   checkouts={} checkins={} waits={}\n",
        stats.checkouts, stats.checkins, stats.waits
    );

    println!("=== 예제 완료 ===");
    Ok(())
}

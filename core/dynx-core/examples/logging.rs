//! 로깅 시스템 사용 예제
//!
//! 실행: RUST_LOG=debug cargo run --example logging --features logging

use dynx_core::{Database, Scan, values};

fn main() -> dynx_core::DynxResult<()> {
    // 로깅 초기화
    #[cfg(feature = "logging")]
    dynx_core::logging::init();

    println!("=== DYNX 로깅 예제 ===\n");
    println!("환경 변수 RUST_LOG로 로그 레벨 조정 가능:");
    println!("  RUST_LOG=debug  - 스키마 reload, 스캔 계획, 커서 수명");
    println!("  RUST_LOG=info   - open, DDL 실행, backfill (기본값)");
    println!("  RUST_LOG=warn   - 동시 DDL 흡수, 버려진 배치\n");

    let db = Database::open_in_memory()?;

    // DDL이 실행되며 info 로그 출력
    println!("데이터 삽입 중...");
    db.insert("thread", "tid", 1, "subject", &values!["hello"])?;
    db.insert("thread", "tid", 2, "subject", &values!["world"])?;

    // 해시 컬럼 생성 + backfill 로그
    println!("\n필터 조회 중...");
    db.get_col("thread", "tid", &Scan::all().filter("subject=world"))?;

    // 커밋 없이 버려진 배치는 warn
    println!("\n배치 폐기 중...");
    {
        let mut batch = db.batch();
        batch.insert("thread", "tid", 3, "subject", &values!["lost"])?;
    }

    println!("\n=== 예제 완료 ===");
    println!("\n주의: logging feature가 활성화되어야 로그가 출력됩니다.");
    println!("실행: RUST_LOG=debug cargo run --example logging --features logging");

    Ok(())
}

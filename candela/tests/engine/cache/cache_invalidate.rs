use crate::helpers::{BTC_USD, builder, dt, exchange};
use candela::Granularity;

#[tokio::test]
async fn invalidate_forces_a_refetch_and_removes_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let ex = exchange();
    let candela = builder(&ex).cache_dir(dir.path()).build().unwrap();
    let (a, b) = (dt(2021, 1, 1, 0), dt(2021, 1, 3, 0));

    candela.candles(BTC_USD, Granularity::H1, a, b).await.unwrap();
    assert_eq!(ex.calls(), 2);

    candela.cache().invalidate(BTC_USD, Granularity::H1).await.unwrap();
    assert!(!dir.path().join("BTC-USD_3600.json").exists());
    assert_eq!(
        candela.cache().envelope(BTC_USD, Granularity::H1).await.unwrap(),
        None
    );

    candela.candles(BTC_USD, Granularity::H1, a, b).await.unwrap();
    assert_eq!(ex.calls(), 4);
}

//! 費率來源

use rust_decimal::Decimal;
use std::collections::HashMap;

/// 費率來源介面
///
/// 工時計費等需要查詢主檔費率的計算皆透過此介面注入，
/// 查無費率時回傳 `None`，由呼叫端決定如何回報
pub trait RateProvider {
    fn rate(&self, element_id: &str) -> Option<Decimal>;
}

impl RateProvider for HashMap<String, Decimal> {
    fn rate(&self, element_id: &str) -> Option<Decimal> {
        self.get(element_id).copied()
    }
}

impl<T: RateProvider + ?Sized> RateProvider for &T {
    fn rate(&self, element_id: &str) -> Option<Decimal> {
        (**self).rate(element_id)
    }
}

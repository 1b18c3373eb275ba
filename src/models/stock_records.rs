use chrono::NaiveDate;
use diesel::prelude::*;

use crate::schema::stock_records;

#[derive(Queryable, Debug, Clone, PartialEq)]
pub struct StockRecord {
    pub id: i64,
    pub trade_date: NaiveDate,
    pub symbol: String,
    pub series: String,
    pub prev_close: f64,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub last_price: f64,
    pub close_price: f64,
    pub vwap: f64,
    pub volume: i64,
    pub turnover: f64,
    pub trades: i64,
    pub deliverable: i64,
    pub percent_deliverable: f64,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = stock_records)]
pub struct NewStockRecord {
    pub trade_date: NaiveDate,
    pub symbol: String,
    pub series: String,
    pub prev_close: f64,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub last_price: f64,
    pub close_price: f64,
    pub vwap: f64,
    pub volume: i64,
    pub turnover: f64,
    pub trades: i64,
    pub deliverable: i64,
    pub percent_deliverable: f64,
}

impl NewStockRecord {
    /// 附上存储层分配的代理主键
    pub fn with_id(self, id: i64) -> StockRecord {
        StockRecord {
            id,
            trade_date: self.trade_date,
            symbol: self.symbol,
            series: self.series,
            prev_close: self.prev_close,
            open_price: self.open_price,
            high_price: self.high_price,
            low_price: self.low_price,
            last_price: self.last_price,
            close_price: self.close_price,
            vwap: self.vwap,
            volume: self.volume,
            turnover: self.turnover,
            trades: self.trades,
            deliverable: self.deliverable,
            percent_deliverable: self.percent_deliverable,
        }
    }
}

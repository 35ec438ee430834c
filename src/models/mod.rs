pub mod activity;
pub mod cart;
pub mod catalog;
pub mod coupon;
pub mod customer;
pub mod discount;
pub mod order;
pub mod points;
pub mod promo;
pub mod pwp;
pub mod response;

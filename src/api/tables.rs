//! Endpoint tables for each resource group, as documented by the service.

use super::endpoint::{substitute, Endpoint};

pub fn spaces() -> Vec<Endpoint> {
    vec![
        Endpoint::get("1.1/space/locations")
            .with_default("details", false)
            .with_default("admin_only", false),
        Endpoint::get("1.1/space/form/{ids}")
            .named("form")
            .resolve_with(substitute),
        Endpoint::get("1.1/space/question/{ids}")
            .named("question")
            .resolve_with(substitute),
        Endpoint::get("1.1/space/categories/{ids}")
            .named("categories")
            .resolve_with(substitute)
            .with_default("admin_only", false),
        Endpoint::get("1.1/space/category/{cid}")
            .named("category")
            .resolve_with(substitute)
            .require("cid")
            .with_default("details", false)
            .today("availability"),
        Endpoint::get("1.1/space/item/{ids}")
            .named("item")
            .resolve_with(substitute)
            .require("ids")
            .today("availability"),
        Endpoint::get("1.1/space/items/{location_id}")
            .named("items")
            .resolve_with(substitute)
            .require("location_id")
            .omit("category")
            .omit("zoneId")
            .omit("accessibleOnly")
            .omit("bookable")
            .omit("powered")
            .omit("availability")
            .omit("pageIndex")
            .omit("pageSize"),
        Endpoint::post("1.1/space/reserve")
            .named("reserve")
            .require("start")
            .require("fname")
            .require("lname")
            .require("email")
            .require("bookings")
            .omit("nickname")
            .with_default("adminbooking", false)
            .with_default("test", false),
        Endpoint::get("1.1/space/booking")
            .named("booking")
            .require("book_ids")
            .with_default("formAnswers", false),
        Endpoint::get("1.1/space/items/bookings")
            .omit("eid")
            .omit("seat_id")
            .omit("cid")
            .omit("lid")
            .omit("email")
            .today("date")
            .with_default("days", 0)
            .with_default("limit", 20)
            .with_default("page", 1)
            .with_default("formAnswers", false),
        Endpoint::post("1.1/space/cancel/{ids}")
            .named("cancel")
            .resolve_with(substitute),
        Endpoint::get("api/1.1/space/seat/{seat_id}")
            .named("seat")
            .resolve_with(substitute)
            .require("seat_id")
            .omit("availability"),
        Endpoint::get("api/1.1/space/seats/{location_id}")
            .named("seats")
            .resolve_with(substitute)
            .require("location_id")
            .omit("spaceId")
            .omit("categoryId")
            .omit("seatId")
            .omit("zoneId")
            .with_default("accessibleOnly", false)
            .with_default("powered", false)
            .today("availability")
            .with_default("pageIndex", 0)
            .with_default("pageSize", 20),
        Endpoint::get("api/1.1/space/zone/{zone_id}")
            .named("zone")
            .resolve_with(substitute)
            .require("zone_id"),
        Endpoint::get("api/1.1/space/zones/{location_id}")
            .named("zones")
            .resolve_with(substitute)
            .require("location_id"),
    ]
}

pub fn room_bookings() -> Vec<Endpoint> {
    vec![Endpoint::get("1.1/room_groups")]
}

pub fn appointments() -> Vec<Endpoint> {
    vec![Endpoint::get("1.1/appointments")
        .require("user_id")
        .omit("location_id")
        .omit("group_id")
        .omit("category_id")
        .with_default("limit", 20)]
}

pub fn equipment() -> Vec<Endpoint> {
    vec![Endpoint::get("1.1/equipment/locations")
        .with_default("details", false)
        .with_default("admin_only", false)]
}

pub fn events() -> Vec<Endpoint> {
    vec![Endpoint::get("1.1/events")
        .require("cal_id")
        .today("date")
        .with_default("days", 30)
        .with_default("limit", 20)
        .omit("campus")
        .omit("category")
        .omit("audience")
        .omit("tag")]
}

pub fn calendars() -> Vec<Endpoint> {
    vec![Endpoint::get("1.1/calendars")]
}

pub fn hours() -> Vec<Endpoint> {
    vec![Endpoint::get("api/1.1/hours/{ids}")
        .named("hours")
        .resolve_with(substitute)
        .require("ids")
        .today("from")
        .today("to")]
}

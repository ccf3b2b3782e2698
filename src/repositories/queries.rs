//! Catálogo de consultas SQL
//!
//! Todas las sentencias que usa `LoadRepository`. Las tres lecturas (activas,
//! históricas y por id) comparten la misma proyección base `all_loads` y solo
//! cambian el filtro final, así nunca divergen en columnas ni en joins.

/// Proyección base: una fila por carga con cliente, conductor, etapa y tipo
macro_rules! all_loads_cte {
    () => {
        r#"
        with all_loads as (
            select
                l.loads_id,
                l.created_at,
                l.modified_at,
                lt.load_type,
                c.phone_num as client_number,
                d.name_surname as driver_name,
                d.phone_num as driver_phone,
                ls.status as current_status,
                l.start_city,
                l.engage_city,
                l.clear_city,
                l.finish_city
            from loads l
            join clients c
                on l.client_id = c.clients_id
            join drivers d
                on l.driver_id = d.drivers_id
            join load_statuses ls
                on l.current_status_id = ls.load_status_id
            join load_types lt
                on l.load_type_id = lt.load_types_id
        )
        "#
    };
}

/// Serializa inicializaciones concurrentes del esquema (varias instancias)
pub const SCHEMA_LOCK: &str = "select pg_advisory_xact_lock(4242001)";

/// Esquema idempotente; se ejecuta en cada arranque
pub const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    create table if not exists clients (
        clients_id serial primary key,
        phone_num varchar(12) not null unique,
        check (char_length(phone_num) = 12),
        check (phone_num ~ '^[0-9]+$')
    )
    "#,
    r#"
    create table if not exists drivers (
        drivers_id serial primary key,
        name_surname text not null,
        phone_num varchar(12) not null,
        check (char_length(phone_num) = 12),
        check (phone_num ~ '^[0-9]+$'),
        unique (name_surname, phone_num)
    )
    "#,
    r#"
    create table if not exists load_statuses (
        load_status_id serial primary key,
        status varchar(10) not null unique
    )
    "#,
    r#"
    create table if not exists load_types (
        load_types_id serial primary key,
        load_type varchar(8) not null unique
    )
    "#,
    r#"
    create table if not exists loads (
        loads_id char(32) primary key,
        created_at timestamptz not null default now(),
        modified_at timestamptz not null,
        load_type_id int4 not null references load_types(load_types_id),
        client_id int4 not null references clients(clients_id),
        driver_id int4 not null references drivers(drivers_id),
        current_status_id int4 not null references load_statuses(load_status_id),
        start_city text not null,
        engage_city text,
        clear_city text,
        finish_city text not null
    )
    "#,
    r#"
    insert into load_statuses (status)
    values ('start'), ('engage'), ('drive'), ('clear'), ('finish'), ('history')
    on conflict (status) do nothing
    "#,
    r#"
    insert into load_types (load_type)
    values ('external'), ('internal')
    on conflict (load_type) do nothing
    "#,
];

pub const SELECT_ACTIVE_LOADS: &str = concat!(
    all_loads_cte!(),
    r#"
    select * from all_loads
    where current_status != 'history'
    order by modified_at, loads_id
    "#
);

pub const SELECT_HISTORICAL_LOADS: &str = concat!(
    all_loads_cte!(),
    r#"
    select * from all_loads
    where current_status = 'history'
    order by modified_at, loads_id
    "#
);

pub const SELECT_LOAD_BY_ID: &str = concat!(
    all_loads_cte!(),
    r#"
    select * from all_loads
    where loads_id = $1
    "#
);

pub const COUNT_ACTIVE_LOADS: &str = concat!(
    all_loads_cte!(),
    r#"
    select count(*) from all_loads
    where current_status != 'history'
    "#
);

pub const COUNT_HISTORICAL_LOADS: &str = concat!(
    all_loads_cte!(),
    r#"
    select count(*) from all_loads
    where current_status = 'history'
    "#
);

/// Upsert atómico: devuelve el id existente si el teléfono ya está
pub const UPSERT_CLIENT: &str = r#"
    insert into clients (phone_num)
    values ($1)
    on conflict (phone_num)
    do update set phone_num = excluded.phone_num
    returning clients_id
"#;

pub const UPSERT_DRIVER: &str = r#"
    insert into drivers (name_surname, phone_num)
    values ($1, $2)
    on conflict (name_surname, phone_num)
    do update set
        name_surname = excluded.name_surname,
        phone_num = excluded.phone_num
    returning drivers_id
"#;

/// Un tipo o etapa desconocidos dejan la FK en NULL y violan NOT NULL
pub const INSERT_LOAD: &str = r#"
    insert into loads (
        loads_id,
        created_at,
        modified_at,
        load_type_id,
        client_id,
        driver_id,
        current_status_id,
        start_city,
        engage_city,
        clear_city,
        finish_city
    )
    values (
        $1,
        $2,
        $3,
        (select load_types_id from load_types where load_type = $4),
        $5,
        $6,
        (select load_status_id from load_statuses where status = $7),
        $8,
        $9,
        $10,
        $11
    )
    returning loads_id
"#;

pub const UPDATE_LOAD_STATUS: &str = r#"
    update loads l
    set
        modified_at = $1,
        current_status_id = (select load_status_id from load_statuses ls where ls.status = $2)
    where l.loads_id = $3
    returning l.loads_id
"#;

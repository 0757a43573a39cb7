pub mod manual_name;
pub mod nomenclature;
